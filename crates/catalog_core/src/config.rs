/// Catalog service configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Page length used when a paged query omits `pageLength`.
    pub default_page_length: u32,
    /// Largest `pageLength` a caller may request.
    pub max_page_length: u32,
}

pub const DEFAULT_PAGE_LENGTH: u32 = 25;
pub const MAX_PAGE_LENGTH: u32 = 250;

impl Default for CatalogConfig {
    fn default() -> Self {
        let max_page_length = env_u32("CATALOG_MAX_PAGE_LENGTH").unwrap_or(MAX_PAGE_LENGTH);
        let default_page_length = env_u32("CATALOG_DEFAULT_PAGE_LENGTH")
            .unwrap_or(DEFAULT_PAGE_LENGTH)
            .min(max_page_length);
        Self {
            default_page_length,
            max_page_length,
        }
    }
}

impl CatalogConfig {
    /// Built-in limits, ignoring the environment.
    pub fn fixed() -> Self {
        Self {
            default_page_length: DEFAULT_PAGE_LENGTH,
            max_page_length: MAX_PAGE_LENGTH,
        }
    }
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|v| *v > 0)
}
