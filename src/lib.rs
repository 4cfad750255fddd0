pub mod attention;
pub mod calibration;
pub mod classify;
pub mod config;
pub mod constants;
pub mod feature_log;
pub mod logging;
pub mod replay;
pub mod session;
pub mod signals;
pub mod source;
pub mod thresholds;
pub mod window;
