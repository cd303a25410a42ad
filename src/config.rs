use comrak::ComrakOptions;
use gotham_derive::StateData;

/// Application wide settings defined in configuration file.
#[derive(Deserialize, StateData, Clone)]
pub struct Settings {
    /// Postgres database url
    pub database_url: String,
    /// IP address to bind to
    pub host_address: String,
    /// Cookie settings
    pub cookie: Cookie,
    /// Page sizes for the paginated listings
    #[serde(default)]
    pub pages: Pages,
    /// Requests slower than this many seconds are logged as warnings
    #[serde(default = "default_slow_request_time")]
    pub slow_request_time: f64,
}

impl Settings {
    pub fn from_slice(data: &[u8]) -> Result<Self, toml::de::Error> {
        toml::from_slice(data)
    }
}

fn default_slow_request_time() -> f64 {
    0.5
}

/// Cookie related settings
#[derive(Deserialize, Clone)]
pub struct Cookie {
    /// Require HTTPS for cookies
    pub secure: bool,
    /// Restrict cookies to given domain if set
    pub domain: Option<String>,
}

/// Number of entries shown per page
#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct Pages {
    pub posts: i64,
    pub followers: i64,
    pub comments: i64,
}

impl Default for Pages {
    fn default() -> Self {
        Pages {
            posts: 10,
            followers: 30,
            comments: 20,
        }
    }
}

/// Options for rendering post bodies using comrak. The defaults never pass raw HTML through.
pub fn markdown_options() -> ComrakOptions {
    ComrakOptions::default()
}
