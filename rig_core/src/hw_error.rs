//! Maps `Box<dyn Error>` from the hardware seam to typed `RigError`.
//!
//! The traits in `rig_traits` use `Box<dyn Error + Send + Sync>`; this module
//! converts those to our typed error enum, with an optional feature-gated
//! path for `rig_hardware::HwError` downcasting.

use crate::error::RigError;

/// Map a motor-line failure to a typed `RigError`.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> RigError {
    #[cfg(feature = "hardware-errors")]
    {
        use rig_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Closed => RigError::State("motor lines already closed".into()),
                HwError::CounterBusy(id) => RigError::Hardware(format!(
                    "step counter still reserved by generator {id}"
                )),
                other => RigError::Hardware(other.to_string()),
            };
        }
    }
    RigError::Hardware(e.to_string())
}

/// Map an analog-input failure. Every analog failure is a sensor failure.
pub fn map_sensor_error(e: &(dyn std::error::Error + 'static)) -> RigError {
    #[cfg(feature = "hardware-errors")]
    {
        use rig_hardware::error::HwError;
        if let Some(HwError::Closed) = e.downcast_ref::<HwError>() {
            return RigError::Sensor("analog input already closed".into());
        }
    }
    RigError::Sensor(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_errors_fall_back_to_message() {
        let e = std::io::Error::other("line 7 write failed");
        assert_eq!(
            map_hw_error(&e),
            RigError::Hardware("line 7 write failed".into())
        );
        assert!(map_sensor_error(&e).is_fatal());
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hw_errors_are_downcast() {
        use rig_hardware::error::HwError;
        let e = HwError::CounterBusy(3);
        assert!(matches!(map_hw_error(&e), RigError::Hardware(m) if m.contains("generator 3")));
        assert!(matches!(map_hw_error(&HwError::Closed), RigError::State(_)));
    }
}
