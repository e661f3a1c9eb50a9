//! Serial baud rate selection.

use tracing::warn;

/// Baud rates the serial adapter can configure.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const SUPPORTED_BAUD_RATES: &[u32] = &[
    1200, 1800, 9600, 19200, 38400, 57600, 115_200, 460_800, 921_600,
];

/// Baud rates the serial adapter can configure.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub const SUPPORTED_BAUD_RATES: &[u32] = &[1200, 1800, 9600, 19200, 38400, 57600, 115_200];

/// Rate used when the requested one is not supported.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Returns `requested` if supported, otherwise falls back to 115200 8N1.
pub fn resolve_baud(requested: u32) -> u32 {
    if SUPPORTED_BAUD_RATES.contains(&requested) {
        requested
    } else {
        warn!(
            requested,
            fallback = DEFAULT_BAUD_RATE,
            "desired baud rate could not be set, falling back to default rate"
        );
        DEFAULT_BAUD_RATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_rates_pass_through() {
        for &rate in SUPPORTED_BAUD_RATES {
            assert_eq!(resolve_baud(rate), rate);
        }
    }

    #[test]
    fn unsupported_rates_fall_back() {
        assert_eq!(resolve_baud(4800), DEFAULT_BAUD_RATE);
        assert_eq!(resolve_baud(0), DEFAULT_BAUD_RATE);
        assert_eq!(resolve_baud(230_400), DEFAULT_BAUD_RATE);
    }

    #[test]
    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn high_rates_pass_on_linux() {
        assert_eq!(resolve_baud(921_600), 921_600);
    }

    #[test]
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    fn high_rates_fall_back_off_linux() {
        assert_eq!(resolve_baud(460_800), DEFAULT_BAUD_RATE);
        assert_eq!(resolve_baud(921_600), DEFAULT_BAUD_RATE);
    }
}
