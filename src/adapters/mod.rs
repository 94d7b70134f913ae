//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter     | Implements              | Connects to                  |
//! |-------------|-------------------------|------------------------------|
//! | `confirm`   | RadioConfirmationPort   | Service-state updates        |
//! | `hardware`  | RadioPowerPort          | Simulated modem (host)       |
//! |             | ConnectivityPackagePort |                              |
//! |             | SignalDetectorPort      |                              |
//! |             | SettingsPort            |                              |
//! |             | EventSink               |                              |
//! | `log_sink`  | EventSink               | `log` output                 |
//! | `time`      | ClockPort               | `std::time::Instant`         |

pub mod confirm;
pub mod hardware;
pub mod log_sink;
pub mod time;
