use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
    value::Uncased,
};

/// Configuration file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "mediasweep.toml";

/// Prefix for nested environment overrides, e.g. `MEDIASWEEP__CLEANUP__DRY_RUN`.
pub const ENV_PREFIX: &str = "MEDIASWEEP__";

/// Largest page the asset store search API will return.
pub const MAX_SEARCH_PAGE_SIZE: usize = 500;

/// Largest number of public ids the asset store accepts per delete call.
pub const MAX_DELETE_BATCH: usize = 100;

const REDACTED: &str = "********";

/// Flat credential variables supplied by the scheduling environment, mapped
/// onto their nested configuration keys.
const LEGACY_ENV: [(&str, &str); 5] = [
    ("FIREBASE_PROJECT_ID", "firestore.project_id"),
    ("FIREBASE_API_KEY", "firestore.api_key"),
    ("CLOUDINARY_CLOUD_NAME", "cloudinary.cloud_name"),
    ("CLOUDINARY_API_KEY", "cloudinary.api_key"),
    ("CLOUDINARY_API_SECRET", "cloudinary.api_secret"),
];

/// Connection settings for the Firestore REST API (the document store).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FirestoreConfig {
    /// Google Cloud project hosting the database
    pub project_id: String,
    /// Web API key appended as `key=` to every request
    pub api_key: Option<String>,
    /// Database name inside the project
    pub database: String,
    /// REST endpoint root
    pub base_url: Url,
    /// Documents requested per listing page
    pub page_size: usize,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            api_key: None,
            database: "(default)".to_string(),
            base_url: Url::parse("https://firestore.googleapis.com/v1/")
                .expect("static firestore url is valid"),
            page_size: 300,
        }
    }
}

/// Connection settings for the Cloudinary Admin API (the asset store).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Admin API endpoint root
    pub base_url: Url,
    /// Resource type searched and deleted (`image`, `video`, `raw`)
    pub resource_type: String,
    /// Delivery type of the managed assets
    pub delivery_type: String,
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            base_url: Url::parse("https://api.cloudinary.com/v1_1/")
                .expect("static cloudinary url is valid"),
            resource_type: "image".to_string(),
            delivery_type: "upload".to_string(),
        }
    }
}

/// Where asset references live in the document store.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferenceSources {
    /// Catalog collection scanned in full
    pub catalog_collection: String,
    /// Array field of image urls on each catalog record
    pub catalog_image_field: String,
    /// Collection holding the singleton settings documents
    pub settings_collection: String,
    pub logo_document: String,
    pub logo_field: String,
    pub slider_document: String,
    pub slides_field: String,
    /// Image url field on each slide entry
    pub slide_image_field: String,
}

impl Default for ReferenceSources {
    fn default() -> Self {
        Self {
            catalog_collection: "products".to_string(),
            catalog_image_field: "imageUrls".to_string(),
            settings_collection: "settings".to_string(),
            logo_document: "store_details".to_string(),
            logo_field: "logoUrl".to_string(),
            slider_document: "hero_slider".to_string(),
            slides_field: "slides".to_string(),
            slide_image_field: "imageUrl".to_string(),
        }
    }
}

/// Orphan cleanup job settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Asset store folder whose contents are reconciled
    pub folder: String,
    /// Results requested per search page (at most 500)
    pub search_page_size: usize,
    /// Public ids per delete call (at most 100)
    pub batch_size: usize,
    /// Log orphans without deleting them
    pub dry_run: bool,
    /// Pause between consecutive delete calls
    #[serde(with = "humantime_serde")]
    pub batch_pause: Duration,
    pub sources: ReferenceSources,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            folder: "sundorica".to_string(),
            search_page_size: MAX_SEARCH_PAGE_SIZE,
            batch_size: MAX_DELETE_BATCH,
            dry_run: false,
            batch_pause: Duration::ZERO,
            sources: ReferenceSources::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    /// Document store connection
    pub firestore: FirestoreConfig,
    /// Asset store connection
    pub cloudinary: CloudinaryConfig,
    /// Cleanup job behaviour
    pub cleanup: CleanupConfig,
}

/// Folder, search page and delete batch limits shared by every cleanup
/// configuration.
pub fn validate_cleanup_bounds(
    folder: &str,
    search_page_size: usize,
    batch_size: usize,
) -> anyhow::Result<()> {
    if folder.is_empty() {
        anyhow::bail!("cleanup folder cannot be empty");
    }
    if search_page_size == 0 || search_page_size > MAX_SEARCH_PAGE_SIZE {
        anyhow::bail!(
            "search_page_size must be between 1 and {MAX_SEARCH_PAGE_SIZE}, got {search_page_size}"
        );
    }
    if batch_size == 0 || batch_size > MAX_DELETE_BATCH {
        anyhow::bail!("batch_size must be between 1 and {MAX_DELETE_BATCH}, got {batch_size}");
    }
    Ok(())
}

impl Configuration {
    /// Build the provider chain: defaults, then `path` (or `mediasweep.toml`),
    /// then `MEDIASWEEP__` variables, then the flat credential variables.
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = match path {
            Some(path) => Toml::file(path),
            None => Toml::file(DEFAULT_CONFIG_FILE),
        };

        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(
                Env::raw()
                    .only(&LEGACY_ENV.map(|(var, _)| var))
                    .map(|key| {
                        LEGACY_ENV
                            .iter()
                            .find(|(var, _)| key.as_str().eq_ignore_ascii_case(var))
                            .map(|(_, path)| Uncased::from(*path))
                            .unwrap_or_else(|| Uncased::from(key.as_str()))
                    }),
            )
    }

    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::figment(None).extract().map_err(Box::new)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        Self::figment(Some(path)).extract().map_err(Box::new)
    }

    /// Reject page, batch and folder settings the asset store cannot honour.
    /// Credentials are left to the calling environment.
    pub fn validate(&self) -> anyhow::Result<()> {
        let cleanup = &self.cleanup;
        validate_cleanup_bounds(&cleanup.folder, cleanup.search_page_size, cleanup.batch_size)?;
        if self.firestore.page_size == 0 {
            anyhow::bail!("firestore.page_size must be positive");
        }
        Ok(())
    }

    /// Copy with every credential replaced, safe to print.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.firestore.api_key.is_some() {
            config.firestore.api_key = Some(REDACTED.to_string());
        }
        if !config.cloudinary.api_key.is_empty() {
            config.cloudinary.api_key = REDACTED.to_string();
        }
        if !config.cloudinary.api_secret.is_empty() {
            config.cloudinary.api_secret = REDACTED.to_string();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_configuration() {
        let config = Configuration::default();

        assert_eq!(config.firestore.database, "(default)");
        assert_eq!(config.firestore.api_key, None);
        assert_eq!(config.cloudinary.resource_type, "image");
        assert_eq!(config.cleanup.folder, "sundorica");
        assert_eq!(config.cleanup.search_page_size, 500);
        assert_eq!(config.cleanup.batch_size, 100);
        assert!(!config.cleanup.dry_run);
        assert_eq!(config.cleanup.batch_pause, Duration::ZERO);
        assert_eq!(config.cleanup.sources.catalog_collection, "products");
    }

    #[test]
    fn test_configless_operation() {
        Jail::expect_with(|_jail| {
            let config: Configuration = Configuration::figment(None).extract()?;
            assert_eq!(config.cleanup.folder, "sundorica");
            assert_eq!(
                config.cloudinary.base_url.as_str(),
                "https://api.cloudinary.com/v1_1/"
            );
            Ok(())
        });
    }

    #[test]
    fn test_legacy_credential_variables() {
        Jail::expect_with(|jail| {
            jail.set_env("FIREBASE_PROJECT_ID", "shop-prod");
            jail.set_env("FIREBASE_API_KEY", "fb-key");
            jail.set_env("CLOUDINARY_CLOUD_NAME", "demo");
            jail.set_env("CLOUDINARY_API_KEY", "1234");
            jail.set_env("CLOUDINARY_API_SECRET", "s3cr3t");

            let config: Configuration = Configuration::figment(None).extract()?;
            assert_eq!(config.firestore.project_id, "shop-prod");
            assert_eq!(config.firestore.api_key.as_deref(), Some("fb-key"));
            assert_eq!(config.cloudinary.cloud_name, "demo");
            assert_eq!(config.cloudinary.api_key, "1234");
            assert_eq!(config.cloudinary.api_secret, "s3cr3t");
            Ok(())
        });
    }

    #[test]
    fn test_nested_env_var_override() {
        Jail::expect_with(|jail| {
            jail.set_env("MEDIASWEEP__CLEANUP__FOLDER", "staging");
            jail.set_env("MEDIASWEEP__CLEANUP__DRY_RUN", "true");
            jail.set_env("MEDIASWEEP__CLEANUP__BATCH_PAUSE", "250ms");
            jail.set_env("MEDIASWEEP__CLEANUP__SOURCES__LOGO_FIELD", "brandLogo");

            let config: Configuration = Configuration::figment(None).extract()?;
            assert_eq!(config.cleanup.folder, "staging");
            assert!(config.cleanup.dry_run);
            assert_eq!(config.cleanup.batch_pause, Duration::from_millis(250));
            assert_eq!(config.cleanup.sources.logo_field, "brandLogo");
            // Untouched siblings keep their defaults
            assert_eq!(config.cleanup.sources.slides_field, "slides");
            Ok(())
        });
    }

    #[test]
    fn test_config_file_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
                [cloudinary]
                cloud_name = "from-file"

                [cleanup]
                folder = "from-file"
                batch_size = 50
                "#,
            )?;
            jail.set_env("MEDIASWEEP__CLEANUP__FOLDER", "from-env");

            let config: Configuration =
                Configuration::figment(Some(Path::new("custom.toml"))).extract()?;
            assert_eq!(config.cloudinary.cloud_name, "from-file");
            assert_eq!(config.cleanup.batch_size, 50);
            assert_eq!(config.cleanup.folder, "from-env");
            Ok(())
        });
    }

    #[test]
    fn test_redacted_hides_credentials() {
        let mut config = Configuration::default();
        config.firestore.api_key = Some("fb-key".to_string());
        config.cloudinary.api_key = "1234".to_string();
        config.cloudinary.api_secret = "s3cr3t".to_string();
        config.cloudinary.cloud_name = "demo".to_string();

        let redacted = config.redacted();
        assert_eq!(redacted.firestore.api_key.as_deref(), Some(REDACTED));
        assert_eq!(redacted.cloudinary.api_key, REDACTED);
        assert_eq!(redacted.cloudinary.api_secret, REDACTED);
        assert_eq!(redacted.cloudinary.cloud_name, "demo");
    }

    #[test]
    fn test_validate_bounds() {
        let mut config = Configuration::default();
        assert!(config.validate().is_ok());

        config.cleanup.batch_size = MAX_DELETE_BATCH + 1;
        assert!(config.validate().is_err());
        config.cleanup.batch_size = 0;
        assert!(config.validate().is_err());
        config.cleanup.batch_size = 1;

        config.cleanup.search_page_size = MAX_SEARCH_PAGE_SIZE + 1;
        assert!(config.validate().is_err());
        config.cleanup.search_page_size = 10;

        config.cleanup.folder.clear();
        assert!(config.validate().is_err());
    }
}
