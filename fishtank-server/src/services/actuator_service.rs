use std::sync::Arc;

use fishtank_api::packet::{op_code, pin_mode, Level};
use fishtank_api::Packet;

use crate::errors::DeviceError;
use crate::services::DeviceLink;

/// A digital output on the controller and how its relay is wired.
///
/// `drive` is the level written to engage the relay. `sense` is the level a pin
/// read reports while engaged. The two are wired independently, so a relay
/// written HIGH may still read back LOW when engaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relay {
    pub name: &'static str,
    pub pin: u16,
    pub drive: Level,
    pub sense: Level,
}

impl Relay {
    pub const BOARD_LED: Relay = Relay::active_low("board_led", 13);
    pub const OUT_WATER_VALVE: Relay = Relay {
        name: "out_water_valve",
        pin: 49,
        drive: Level::Low,
        sense: Level::High,
    };
    /// Normally open valve
    pub const IN_WATER_VALVE: Relay = Relay {
        name: "in_water_valve",
        pin: 48,
        drive: Level::High,
        sense: Level::Low,
    };
    pub const PUMP: Relay = Relay::active_low("pump", 47);
    pub const LIGHT: Relay = Relay::active_low("light", 46);
    pub const PURIFIER: Relay = Relay::active_low("purifier", 45);
    pub const HEATER: Relay = Relay::active_low("heater", 43);

    const fn active_low(name: &'static str, pin: u16) -> Relay {
        Relay { name, pin, drive: Level::Low, sense: Level::Low }
    }

    pub fn output_level(&self, engage: bool) -> Level {
        if engage { self.drive } else { self.drive.invert() }
    }

    pub fn is_engaged(&self, data: f32) -> bool {
        Level::from_data(data) == Some(self.sense)
    }
}

/// PWM pin driving the light dimmer
pub const BRIGHTNESS_PIN: u16 = 9;

const PWM_MAX: f32 = 255.0;

pub struct ActuatorService {
    link: Arc<DeviceLink>,
}

impl ActuatorService {
    pub fn new(link: Arc<DeviceLink>) -> Self {
        Self { link }
    }

    pub async fn switch(&self, relay: Relay, engage: bool) -> Result<(), DeviceError> {
        let level = relay.output_level(engage);
        let request = Packet::new(op_code::PIN_IO)
            .with_pin(relay.pin, pin_mode::OUTPUT)
            .with_data(level.as_data());

        self.link.exchange(request).await?;

        tracing::info!("Switched {} {} (pin {} {:?})", relay.name, if engage { "on" } else { "off" }, relay.pin, level);

        Ok(())
    }

    pub async fn is_engaged(&self, relay: Relay) -> Result<bool, DeviceError> {
        let request = Packet::new(op_code::READ_DIGITAL_PIN).with_pin(relay.pin, pin_mode::INPUT);
        let response = self.link.exchange(request).await?;

        Ok(relay.is_engaged(response.data))
    }

    pub async fn enable_board_led(&self, enable: bool) -> Result<(), DeviceError> {
        self.switch(Relay::BOARD_LED, enable).await
    }

    pub async fn enable_out_water_valve(&self, open: bool) -> Result<(), DeviceError> {
        self.switch(Relay::OUT_WATER_VALVE, open).await
    }

    pub async fn enable_in_water_valve(&self, open: bool) -> Result<(), DeviceError> {
        self.switch(Relay::IN_WATER_VALVE, open).await
    }

    pub async fn enable_pump(&self, enable: bool) -> Result<(), DeviceError> {
        self.switch(Relay::PUMP, enable).await
    }

    pub async fn enable_light(&self, enable: bool) -> Result<(), DeviceError> {
        self.switch(Relay::LIGHT, enable).await
    }

    pub async fn enable_purifier(&self, enable: bool) -> Result<(), DeviceError> {
        self.switch(Relay::PURIFIER, enable).await
    }

    pub async fn enable_heater(&self, enable: bool) -> Result<(), DeviceError> {
        self.switch(Relay::HEATER, enable).await
    }

    pub async fn is_in_water_valve_open(&self) -> Result<bool, DeviceError> {
        self.is_engaged(Relay::IN_WATER_VALVE).await
    }

    pub async fn is_out_water_valve_open(&self) -> Result<bool, DeviceError> {
        self.is_engaged(Relay::OUT_WATER_VALVE).await
    }

    pub async fn is_heater_on(&self) -> Result<bool, DeviceError> {
        self.is_engaged(Relay::HEATER).await
    }

    /// Water temperature in Celsius. Non-positive values mean the probe failed.
    pub async fn read_temperature(&self) -> Result<f32, DeviceError> {
        let response = self.link.exchange(Packet::new(op_code::READ_TEMPERATURE)).await?;

        Ok(response.data)
    }

    /// Sets the light dimmer, `percentage` in `0..=1` (clamped).
    pub async fn set_brightness(&self, percentage: f32) -> Result<(), DeviceError> {
        let duty = (percentage.clamp(0.0, 1.0) * PWM_MAX).round();
        let request = Packet::new(op_code::ANALOG_WRITE)
            .with_pin(BRIGHTNESS_PIN, pin_mode::OUTPUT)
            .with_data(duty);

        self.link.exchange(request).await?;

        tracing::info!("Set brightness to {}/{}", duty, PWM_MAX);

        Ok(())
    }

    pub async fn read_brightness(&self) -> Result<f32, DeviceError> {
        let request = Packet::new(op_code::READ_ANALOG_PIN).with_pin(BRIGHTNESS_PIN, pin_mode::INPUT);
        let response = self.link.exchange(request).await?;

        Ok((response.data / PWM_MAX).clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::device_link::LinkConfig;
    use crate::services::serial::mock::MockDevice;

    fn actuator(device: &MockDevice) -> ActuatorService {
        ActuatorService::new(Arc::new(DeviceLink::new(device.connector(), "mock", LinkConfig::default())))
    }

    #[tokio::test(start_paused = true)]
    async fn test_relays_drive_their_wired_level() {
        let device = MockDevice::new();
        let actuator = actuator(&device);

        actuator.enable_light(true).await.unwrap();
        actuator.enable_heater(false).await.unwrap();
        actuator.enable_out_water_valve(true).await.unwrap();
        actuator.enable_in_water_valve(true).await.unwrap();

        assert_eq!(device.pin(46), Some(0.0));
        assert_eq!(device.pin(43), Some(1.0));
        assert_eq!(device.pin(49), Some(0.0));
        assert_eq!(device.pin(48), Some(1.0));

        actuator.enable_in_water_valve(false).await.unwrap();
        assert_eq!(device.pin(48), Some(0.0));

        let requests = device.requests();
        assert!(requests.iter().all(|r| r.op_code == op_code::PIN_IO && r.pin_mode == pin_mode::OUTPUT));
    }

    #[tokio::test(start_paused = true)]
    async fn test_valve_reads_use_per_pin_polarity() {
        let device = MockDevice::new();
        let actuator = actuator(&device);

        device.set_pin(48, 0.0).set_pin(49, 0.0);
        assert!(actuator.is_in_water_valve_open().await.unwrap());
        assert!(!actuator.is_out_water_valve_open().await.unwrap());

        device.set_pin(48, 1.0).set_pin(49, 1.0);
        assert!(!actuator.is_in_water_valve_open().await.unwrap());
        assert!(actuator.is_out_water_valve_open().await.unwrap());

        device.set_pin(43, 0.0);
        assert!(actuator.is_heater_on().await.unwrap());

        let last = device.requests().pop().unwrap();
        assert_eq!(last.op_code, op_code::READ_DIGITAL_PIN);
        assert_eq!(last.pin_mode, pin_mode::INPUT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_temperature() {
        let device = MockDevice::new();
        device.set_temperature(26.25);

        assert_eq!(actuator(&device).read_temperature().await.unwrap(), 26.25);
    }

    #[tokio::test(start_paused = true)]
    async fn test_brightness_maps_to_pwm_duty() {
        let device = MockDevice::new();
        let actuator = actuator(&device);

        actuator.set_brightness(0.5).await.unwrap();
        assert_eq!(device.pin(BRIGHTNESS_PIN), Some(128.0));
        assert!((actuator.read_brightness().await.unwrap() - 128.0 / 255.0).abs() < f32::EPSILON);

        actuator.set_brightness(1.7).await.unwrap();
        assert_eq!(device.pin(BRIGHTNESS_PIN), Some(255.0));
    }

    #[test]
    fn test_unknown_level_is_never_engaged() {
        assert!(!Relay::LIGHT.is_engaged(2.0));
        assert!(Relay::LIGHT.is_engaged(0.0));
        assert_eq!(Relay::IN_WATER_VALVE.output_level(false), Level::High.invert());
    }
}
