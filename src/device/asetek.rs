//! Asetek 5th generation cooler driver.
//!
//! High-level interface for NZXT Kraken X31/X41/X61 coolers built on the
//! [`TransactionManager`].

use tracing::{info, warn};

use crate::config::DriverOptions;
use crate::device::transaction::TransactionManager;
use crate::device::transport::Transport;
use crate::error::{AsetekError, Result};
use crate::protocol::{
    AnimationSpeed, Channel, LightingFrame, LightingMode, Rgb, StatusReport, encode_fixed_speed,
    encode_lighting, encode_profile, prepare,
};
use crate::storage::LightingStore;

// =============================================================================
// AsetekCooler
// =============================================================================

/// Asetek cooler handle.
///
/// # Example
///
/// ```no_run
/// use asetek_rust_devices::config::DriverOptions;
/// use asetek_rust_devices::device::{AsetekCooler, UsbTransport};
/// use asetek_rust_devices::protocol::Channel;
/// use asetek_rust_devices::storage::FileLightingStore;
///
/// let transport = UsbTransport::find_first()?;
/// let store = FileLightingStore::in_data_dir()?;
/// let mut cooler = AsetekCooler::new(transport, store, DriverOptions::default())?;
///
/// cooler.connect()?;
/// println!("{}", cooler.get_status()?);
/// cooler.set_fixed_speed(Channel::Pump, 80)?;
/// cooler.disconnect();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct AsetekCooler<T: Transport, S: LightingStore> {
    manager: TransactionManager<T>,
    store: S,
    lighting: LightingFrame,
}

impl<T: Transport, S: LightingStore> AsetekCooler<T, S> {
    /// Create a driver; the last applied lighting frame is loaded from
    /// `store` so status reads replay it.
    pub fn new(transport: T, store: S, options: DriverOptions) -> Result<Self> {
        let lighting = store.load()?;
        Ok(Self {
            manager: TransactionManager::new(transport, options),
            store,
            lighting,
        })
    }

    /// Attach to the device and open the USBXpress channel.
    pub fn connect(&mut self) -> Result<()> {
        self.manager.connect()
    }

    /// Close the channel. Never fails; problems are logged.
    pub fn disconnect(&mut self) {
        self.manager.disconnect()
    }

    /// Open the bridge once and release transport buffers.
    pub fn initialize(&mut self) -> Result<()> {
        self.manager.initialize()
    }

    /// Read liquid temperature, fan and pump speeds, and firmware version.
    ///
    /// The device only answers after a write, so the current lighting frame
    /// is sent again; the visible lighting does not change. Dry runs return
    /// an empty report.
    pub fn get_status(&mut self) -> Result<StatusReport> {
        let msg = self.manager.exchange_status(self.lighting.as_bytes())?;
        if self.manager.options().dry_run {
            return Ok(StatusReport::default());
        }
        StatusReport::decode(&msg)
    }

    /// Set a channel to a fixed duty, clamped to the channel bounds.
    ///
    /// The response is read but not required: a failed read is logged.
    pub fn set_fixed_speed(&mut self, channel: Channel, duty: i32) -> Result<()> {
        let frame = encode_fixed_speed(channel, duty)?;
        info!("setting {} PWM duty to {}%", channel, frame[1]);

        self.manager.begin_transaction()?;
        self.write_or_abort(&frame)?;
        if let Err(err) = self.manager.end_transaction_and_read() {
            warn!("no response after setting {} duty: {}", channel, err);
        }
        Ok(())
    }

    /// Apply a (temperature, duty) profile to the fan.
    ///
    /// The profile is normalized to the device table before anything is
    /// sent; invalid profiles never reach the transport.
    pub fn set_speed_profile(&mut self, channel: Channel, profile: &[(i32, i32)]) -> Result<()> {
        let table = prepare(channel, profile)?;
        let frame = encode_profile(channel, &table)?;
        self.manager.transact(&frame)?;
        Ok(())
    }

    /// Set the lighting mode and colors.
    ///
    /// The applied frame becomes the new lighting state once the write
    /// succeeds, even if the response or the save is lost afterwards; the
    /// transaction is always closed before either error is returned. Dry
    /// runs leave the stored state untouched.
    pub fn set_color(
        &mut self,
        channel: Channel,
        mode: LightingMode,
        colors: &[Rgb],
        speed: &AnimationSpeed,
    ) -> Result<()> {
        if channel.lighting_type().is_none() {
            return Err(channel.unsupported("lighting"));
        }

        let frame = encode_lighting(mode, colors, speed);
        info!("setting {} lighting to {}", channel, mode);

        self.manager.begin_transaction()?;
        self.write_or_abort(frame.as_bytes())?;

        let saved = if self.manager.options().dry_run {
            Ok(())
        } else {
            self.lighting = frame;
            self.store.save(&frame)
        };

        self.manager.end_transaction_and_read()?;
        saved
    }

    /// The last raw response read from the device.
    pub fn last_frame(&self) -> Option<&[u8]> {
        self.manager.last_frame()
    }

    /// The lighting frame replayed by status reads.
    pub fn lighting_state(&self) -> &LightingFrame {
        &self.lighting
    }

    pub fn options(&self) -> &DriverOptions {
        self.manager.options()
    }

    pub fn manager(&self) -> &TransactionManager<T> {
        &self.manager
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn write_or_abort(&mut self, frame: &[u8]) -> Result<()> {
        self.manager.write(frame).inspect_err(|_| {
            self.manager.abort_transaction();
        })
    }
}

impl<T: Transport, S: LightingStore> std::fmt::Debug for AsetekCooler<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsetekCooler")
            .field("state", &self.manager.state())
            .field("lighting", &self.lighting)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::transaction::ChannelState;
    use crate::device::transport::mock::{Call, MockTransport};
    use crate::protocol::{
        LABEL_FAN_SPEED, LABEL_FIRMWARE, LABEL_LIQUID_TEMP, LABEL_PUMP_SPEED, READ_LENGTH,
        StatusValue, USBXPRESS_FLUSH_BUFFERS, WRITE_LENGTH,
    };
    use crate::storage::MemoryLightingStore;

    fn status_frame() -> Vec<u8> {
        let mut msg = vec![0u8; READ_LENGTH];
        msg[0] = 0x03;
        msg[1] = 0xe8;
        msg[8] = 0x0b;
        msg[9] = 0xb8;
        msg[10] = 29;
        msg[14] = 5;
        msg[0x17..0x1b].copy_from_slice(&[2, 0, 0, 1]);
        msg
    }

    fn cooler(
        transport: MockTransport,
        store: MemoryLightingStore,
        options: DriverOptions,
    ) -> AsetekCooler<MockTransport, MemoryLightingStore> {
        let mut cooler = AsetekCooler::new(transport, store, options).unwrap();
        cooler.connect().unwrap();
        cooler
    }

    fn default_cooler(transport: MockTransport) -> AsetekCooler<MockTransport, MemoryLightingStore> {
        cooler(transport, MemoryLightingStore::new(), DriverOptions::default())
    }

    fn calls_after_connect(cooler: &AsetekCooler<MockTransport, MemoryLightingStore>) -> &[Call] {
        // Open + clear to send
        &cooler.manager().transport().calls[2..]
    }

    #[test]
    fn test_get_status_decodes_report() {
        let mut cooler = default_cooler(MockTransport::new().with_response(status_frame()));
        let report = cooler.get_status().unwrap();

        assert_eq!(report.number(LABEL_LIQUID_TEMP), Some(29.5));
        assert_eq!(report.number(LABEL_FAN_SPEED), Some(1000.0));
        assert_eq!(report.number(LABEL_PUMP_SPEED), Some(3000.0));
        assert_eq!(
            report.get(LABEL_FIRMWARE),
            Some(&StatusValue::Text("2.0.0.1".into()))
        );
        assert_eq!(cooler.last_frame(), Some(status_frame().as_slice()));
    }

    #[test]
    fn test_get_status_replays_stored_lighting() {
        let stored = encode_lighting(
            LightingMode::Alternating,
            &[[255, 0, 0], [0, 0, 255]],
            &AnimationSpeed::Faster,
        );
        let mut cooler = cooler(
            MockTransport::new().with_response(status_frame()),
            MemoryLightingStore::with_frame(stored),
            DriverOptions::default(),
        );
        cooler.get_status().unwrap();

        let writes = cooler.manager().transport().writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(&writes[0][..stored.as_bytes().len()], stored.as_bytes());
        assert!(writes[0][stored.as_bytes().len()..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_get_status_writes_before_reading() {
        let mut cooler = default_cooler(MockTransport::new().with_response(status_frame()));
        cooler.get_status().unwrap();

        let calls = calls_after_connect(&cooler);
        assert!(matches!(
            calls[0],
            Call::Control {
                value: USBXPRESS_FLUSH_BUFFERS,
                ..
            }
        ));
        assert!(matches!(calls[1], Call::Write { endpoint: 0x02, .. }));
        assert!(matches!(
            calls[2],
            Call::Read {
                endpoint: 0x82,
                length: 32
            }
        ));
    }

    #[test]
    fn test_get_status_truncated() {
        let mut cooler = default_cooler(MockTransport::new().with_response(vec![0; 20]));
        let err = cooler.get_status().unwrap_err();
        assert!(matches!(err, AsetekError::TruncatedFrame { length: 20, .. }));
    }

    #[test]
    fn test_fixed_speed_clamps_fan() {
        let mut cooler = default_cooler(MockTransport::new().with_response(status_frame()));
        cooler.set_fixed_speed(Channel::Fan, 10).unwrap();

        let writes = cooler.manager().transport().writes();
        assert_eq!(&writes[0][..2], &[0x12, 30]);
        assert_eq!(writes[0].len(), WRITE_LENGTH);
    }

    #[test]
    fn test_fixed_speed_pump() {
        let mut cooler = default_cooler(MockTransport::new().with_response(status_frame()));
        cooler.set_fixed_speed(Channel::Pump, 150).unwrap();
        assert_eq!(&cooler.manager().transport().writes()[0][..2], &[0x13, 100]);
    }

    #[test]
    fn test_fixed_speed_tolerates_missing_response() {
        let mut cooler = default_cooler(MockTransport::new());
        cooler.set_fixed_speed(Channel::Pump, 60).unwrap();

        assert_eq!(cooler.manager().transport().reads(), 1);
        assert_eq!(cooler.manager().state(), ChannelState::Open);
    }

    #[test]
    fn test_fixed_speed_write_failure_is_fatal() {
        let mut transport = MockTransport::new();
        transport.fail_writes = true;
        let mut cooler = default_cooler(transport);

        let err = cooler.set_fixed_speed(Channel::Fan, 50).unwrap_err();
        assert!(matches!(err, AsetekError::WriteFailed { .. }));
        assert_eq!(cooler.manager().transport().reads(), 0);
        assert_eq!(cooler.manager().state(), ChannelState::Open);
    }

    #[test]
    fn test_fixed_speed_rejects_lighting_channel() {
        let mut cooler = default_cooler(MockTransport::new());
        let err = cooler.set_fixed_speed(Channel::Logo, 50).unwrap_err();
        assert!(matches!(err, AsetekError::UnsupportedChannel { .. }));
        assert!(calls_after_connect(&cooler).is_empty());
    }

    #[test]
    fn test_speed_profile_frame() {
        let mut cooler = default_cooler(MockTransport::new().with_response(status_frame()));
        cooler
            .set_speed_profile(Channel::Fan, &[(20, 30), (40, 60)])
            .unwrap();

        let writes = cooler.manager().transport().writes();
        assert_eq!(
            &writes[0][..14],
            &[0x11, 0x00, 20, 40, 60, 60, 60, 60, 30, 60, 100, 100, 100, 100]
        );
    }

    #[test]
    fn test_speed_profile_validation_before_io() {
        let mut cooler = default_cooler(MockTransport::new());

        let err = cooler.set_speed_profile(Channel::Fan, &[]).unwrap_err();
        assert!(matches!(err, AsetekError::InvalidProfile(_)));

        let too_many: Vec<(i32, i32)> = (0..8).map(|i| (20 + i * 4, 30 + i * 5)).collect();
        let err = cooler.set_speed_profile(Channel::Fan, &too_many).unwrap_err();
        assert!(matches!(err, AsetekError::ProfileTooLarge { .. }));

        let err = cooler
            .set_speed_profile(Channel::Pump, &[(20, 50)])
            .unwrap_err();
        assert!(matches!(err, AsetekError::UnsupportedChannel { .. }));

        assert!(calls_after_connect(&cooler).is_empty());
    }

    #[test]
    fn test_speed_profile_read_failure_is_fatal() {
        let mut cooler = default_cooler(MockTransport::new());
        let err = cooler
            .set_speed_profile(Channel::Fan, &[(30, 40)])
            .unwrap_err();
        assert!(matches!(err, AsetekError::ReadFailed(_)));
    }

    #[test]
    fn test_set_color_logo_off() {
        let mut cooler = default_cooler(MockTransport::new().with_response(status_frame()));
        cooler
            .set_color(
                Channel::Logo,
                LightingMode::Off,
                &[[255, 255, 255]],
                &AnimationSpeed::Normal,
            )
            .unwrap();

        let writes = cooler.manager().transport().writes();
        assert_eq!(writes[0][0], 0x10);
        assert_eq!(&writes[0][1..7], &[0; 6]);
        assert_eq!(writes[0][13], 0);
        assert!(!cooler.lighting_state().is_on());
    }

    #[test]
    fn test_set_color_persists_after_write() {
        let mut cooler = default_cooler(MockTransport::new().with_response(status_frame()));
        cooler
            .set_color(
                Channel::Sync,
                LightingMode::Fixed,
                &[[0, 128, 255]],
                &AnimationSpeed::Normal,
            )
            .unwrap();

        assert_eq!(cooler.store().saves(), 1);
        assert_eq!(cooler.store().load().unwrap(), *cooler.lighting_state());
        assert_eq!(&cooler.lighting_state().as_bytes()[1..4], &[0, 128, 255]);
    }

    #[test]
    fn test_set_color_write_failure_keeps_state() {
        let mut transport = MockTransport::new();
        transport.fail_writes = true;
        let mut cooler = default_cooler(transport);

        let err = cooler
            .set_color(
                Channel::Sync,
                LightingMode::Fixed,
                &[[0, 128, 255]],
                &AnimationSpeed::Normal,
            )
            .unwrap_err();
        assert!(matches!(err, AsetekError::WriteFailed { .. }));
        assert_eq!(cooler.store().saves(), 0);
        assert_eq!(*cooler.lighting_state(), LightingFrame::off());
    }

    #[test]
    fn test_set_color_rejects_fan() {
        let mut cooler = default_cooler(MockTransport::new());
        let err = cooler
            .set_color(
                Channel::Fan,
                LightingMode::Fixed,
                &[[1, 2, 3]],
                &AnimationSpeed::Normal,
            )
            .unwrap_err();
        assert!(matches!(err, AsetekError::UnsupportedChannel { .. }));
        assert!(calls_after_connect(&cooler).is_empty());
    }

    fn dry_run_cooler() -> AsetekCooler<MockTransport, MemoryLightingStore> {
        let options = DriverOptions {
            dry_run: true,
            ..DriverOptions::default()
        };
        cooler(MockTransport::new(), MemoryLightingStore::new(), options)
    }

    #[test]
    fn test_dry_run_sends_nothing_and_keeps_state() {
        let mut cooler = dry_run_cooler();
        cooler
            .set_color(
                Channel::Sync,
                LightingMode::Blinking,
                &[[9, 9, 9]],
                &AnimationSpeed::Slowest,
            )
            .unwrap();

        assert!(calls_after_connect(&cooler).is_empty());
        assert_eq!(cooler.store().saves(), 0);
        assert_eq!(*cooler.lighting_state(), LightingFrame::off());
    }

    #[test]
    fn test_dry_run_commands_need_no_response() {
        let mut cooler = dry_run_cooler();

        cooler
            .set_speed_profile(Channel::Fan, &[(20, 30), (40, 60)])
            .unwrap();
        cooler.set_fixed_speed(Channel::Pump, 70).unwrap();
        assert!(cooler.get_status().unwrap().entries.is_empty());

        assert!(calls_after_connect(&cooler).is_empty());
        assert_eq!(cooler.manager().transport().reads(), 0);
        assert_eq!(cooler.manager().state(), ChannelState::Open);
    }

    /// Store whose saves always fail.
    struct ReadOnlyStore;

    impl LightingStore for ReadOnlyStore {
        fn load(&self) -> Result<LightingFrame> {
            Ok(LightingFrame::off())
        }

        fn save(&mut self, _frame: &LightingFrame) -> Result<()> {
            Err(AsetekError::Storage("read-only".into()))
        }
    }

    #[test]
    fn test_set_color_save_failure_closes_transaction() {
        let mut cooler = AsetekCooler::new(
            MockTransport::new().with_response(status_frame()),
            ReadOnlyStore,
            DriverOptions::default(),
        )
        .unwrap();
        cooler.connect().unwrap();

        let err = cooler
            .set_color(
                Channel::Logo,
                LightingMode::Fixed,
                &[[10, 20, 30]],
                &AnimationSpeed::Normal,
            )
            .unwrap_err();

        assert!(matches!(err, AsetekError::Storage(_)));
        assert_eq!(cooler.manager().state(), ChannelState::Open);
        assert_eq!(cooler.manager().transport().reads(), 1);
        assert_eq!(
            cooler.manager().transport().calls.last(),
            Some(&Call::Release)
        );
        assert_eq!(&cooler.lighting_state().as_bytes()[1..4], &[10, 20, 30]);
    }

    #[test]
    fn test_disconnect_never_fails() {
        let mut transport = MockTransport::new();
        transport.fail_close = true;
        let mut cooler = default_cooler(transport);
        cooler.disconnect();
        assert_eq!(cooler.manager().state(), ChannelState::Closed);
    }
}
