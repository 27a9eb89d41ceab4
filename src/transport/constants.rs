// Buffer related constants
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

// Largest block a block-writing gateway sends in one request
pub const WRITE_BLOCK_SIZE: usize = 16 * 1024 * 1024;

// Progress related constants
// Controls how often progress is printed (in multiples of buffer size)
pub const PROGRESS_UPDATE_INTERVAL: u64 = 100;

// Suffix for in-flight writes, matching what `hdfs dfs -put` uses
pub const STAGING_SUFFIX: &str = "._COPYING_";

// Shell bridge defaults
pub const DEFAULT_CONTAINER: &str = "namenode";
pub const DEFAULT_CONTAINER_TOOL: &str = "docker";
pub const DEFAULT_CONTAINER_TMP: &str = "/tmp";
pub const HDFS_BIN: &str = "hdfs";

// Gateway defaults
pub const DEFAULT_WEBHDFS_ENDPOINT: &str = "http://localhost:9870";
pub const DEFAULT_HDFS_USER: &str = "root";
pub const DEFAULT_WEBHDFS_ATOMIC_DIR: &str = "/tmp/.hdfs-stage/";
pub const DEFAULT_FS_ROOT: &str = "./storage";

// Upload defaults
pub const DEFAULT_BASE_DIR: &str = "/data";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
