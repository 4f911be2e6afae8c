//! Maps `Box<dyn Error>` from capability boundaries to typed `CoverError`.
//!
//! Actuator and store traits in `chronoshade_traits` return boxed errors so
//! any backend can plug in; the controller only ever surfaces the typed enum.
//! With the `hardware-errors` feature, relay errors from
//! `chronoshade_hardware` are recognised exactly instead of by message.

use crate::error::CoverError;

/// Flatten an error and its source chain into one line.
fn describe(e: &(dyn std::error::Error + 'static)) -> String {
    let mut msg = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        msg.push_str(": ");
        msg.push_str(&s.to_string());
        source = s.source();
    }
    msg
}

pub fn map_actuator_error(e: &(dyn std::error::Error + 'static)) -> CoverError {
    #[cfg(feature = "hardware-errors")]
    {
        use chronoshade_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Gpio(msg) => CoverError::Actuator(format!("relay gpio: {msg}")),
                HwError::Injected(relay) => {
                    CoverError::Actuator(format!("relay {relay} did not respond"))
                }
            };
        }
    }
    CoverError::Actuator(describe(e))
}

/// Store failures keep the io error kind when there is one; "permission
/// denied" is far more actionable than the bare message.
pub fn map_store_error(e: &(dyn std::error::Error + 'static)) -> CoverError {
    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        return CoverError::Persistence(format!("{:?}: {}", io.kind(), describe(e)));
    }
    CoverError::Persistence(describe(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("relay did not respond")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn actuator_error_includes_source_chain() {
        let e = Outer(std::io::Error::other("bus off"));
        match map_actuator_error(&e) {
            CoverError::Actuator(msg) => assert_eq!(msg, "relay did not respond: bus off"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hardware_errors_are_recognised() {
        let e = chronoshade_hardware::error::HwError::Injected("porch".into());
        assert_eq!(
            map_actuator_error(&e),
            CoverError::Actuator("relay porch did not respond".into())
        );
    }

    #[test]
    fn store_error_keeps_io_kind() {
        let e = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "state.json");
        match map_store_error(&e) {
            CoverError::Persistence(msg) => assert!(msg.starts_with("PermissionDenied")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
