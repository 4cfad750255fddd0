/// Default EAR blink threshold before calibration
pub const DEFAULT_EAR_BLINK_THRESH: f64 = 0.23;

/// Default MAR yawn threshold before calibration
pub const DEFAULT_MAR_YAWN_THRESH: f64 = 0.6;

/// Default absolute gaze offset below which gaze counts as on-screen
pub const DEFAULT_GAZE_THRESHOLD: f64 = 0.35;

/// Default EMA alpha for both smoothed channels
pub const DEFAULT_EMA_ALPHA: f64 = 0.3;

/// Default aggregation window (seconds)
pub const DEFAULT_WINDOW_SEC: f64 = 10.0;

/// Default calibration session length (seconds)
pub const DEFAULT_CALIBRATION_DURATION: f64 = 30.0;

/// Minimum samples per metric before calibration trusts its median
pub const DEFAULT_MIN_FRAMES_REQUIRED: u32 = 3;

/// Calibration: blink threshold = max(floor, median EAR * factor)
pub const EAR_CALIBRATION_FACTOR: f64 = 0.7;
pub const EAR_THRESHOLD_FLOOR: f64 = 0.12;

/// Calibration: yawn threshold = max(floor, median MAR * factor)
pub const MAR_CALIBRATION_FACTOR: f64 = 1.5;
pub const MAR_THRESHOLD_FLOOR: f64 = 0.45;

/// Calibration: gaze threshold = max(floor, median |gaze| * factor)
pub const GAZE_CALIBRATION_FACTOR: f64 = 1.2;
pub const GAZE_THRESHOLD_FLOOR: f64 = 0.15;

/// Pixel margin around the landmark bounding box for face crops
pub const FACE_CROP_MARGIN_PX: i64 = 10;

/// Share of frames that must contain a face before a window gets an image
pub const FACE_PRESENCE_MIN_RATIO: f64 = 0.5;

/// Emotion tag written when the face-quality gate fails
pub const EMOTION_DETECTION_ISSUES: &str = "detection_issues";

/// Emotion tag written when the classifier fails
pub const EMOTION_UNKNOWN: &str = "unknown";

/// Pause between retries after a transient frame read failure (ms)
pub const FRAME_RETRY_DELAY_MS: u64 = 10;

/// Feature log file name inside the output directory
pub const FEATURE_LOG_FILE: &str = "data.csv";

/// Face crop directory inside the output directory
pub const FACE_IMAGE_DIR: &str = "images";

/// Feature log columns, in write order
pub const FEATURE_LOG_HEADER: [&str; 8] = [
    "timestamp",
    "face_image",
    "emotion",
    "blink_rate",
    "yawn_rate",
    "gaze_ratio",
    "head_pose",
    "head_movement_rate",
];
