pub const FIELD_IMAGES: &str = "images";
pub const FIELD_COMPRESSION_LEVEL: &str = "compressionLevel";
pub const FIELD_FILENAME: &str = "filename";

pub const DEFAULT_FILENAME: &str = "converted";
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024; // 10MB
pub const DEFAULT_MAX_FILES: usize = 20;

/// Upper bound for the text fields of the form.
pub const MAX_TEXT_FIELD_SIZE: usize = 1024;

pub struct Env {
    pub frontend_url: String,
    pub ip: String,
    pub port: u16,
    pub workers: usize,
    pub max_connections: usize,
    pub max_file_size: usize,
    pub max_files: usize,
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> T {
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .unwrap_or_else(|_| panic!("{name} must be a valid {}", std::any::type_name::<T>()))
}

impl Env {
    fn new() -> Self {
        let frontend_url = std::env::var("FRONTEND_URL").unwrap_or_else(|_| "*".to_string());
        let ip = std::env::var("IP").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_var::<u16>("PORT", "3001");
        let workers = parse_var::<usize>("WORKERS", "2");
        let max_connections = parse_var::<usize>("MAX_CONNECTIONS", "256");
        let max_file_size =
            parse_var::<usize>("MAX_FILE_SIZE", &DEFAULT_MAX_FILE_SIZE.to_string());
        let max_files = parse_var::<usize>("MAX_FILES", &DEFAULT_MAX_FILES.to_string());

        Env { frontend_url, ip, port, workers, max_connections, max_file_size, max_files }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
