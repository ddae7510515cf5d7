use std::env;
use std::str::FromStr;

const DEV_JWT_SECRET: &str = "development-secret-change-me";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentBackend {
    Appwrite,
    Postgres,
    Memory,
}

impl FromStr for DocumentBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "appwrite" => Ok(Self::Appwrite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown DOCUMENT_BACKEND '{other}'"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectBackend {
    Appwrite,
    S3,
    Memory,
}

impl FromStr for ObjectBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "appwrite" => Ok(Self::Appwrite),
            "s3" => Ok(Self::S3),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown OBJECT_BACKEND '{other}'"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppwriteConfig {
    pub endpoint: String,
    pub project_id: String,
    pub api_key: String,
    pub database_id: String,
    pub files_collection_id: String,
    pub users_collection_id: String,
    pub bucket_id: String,
}

#[derive(Clone, Debug)]
pub struct S3Config {
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub use_path_style: bool,
    pub public_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_port: u16,
    pub frontend_url: Option<String>,
    pub jwt_secret_pem: String,
    pub document_backend: DocumentBackend,
    pub object_backend: ObjectBackend,
    pub database_url: Option<String>,
    pub appwrite: Option<AppwriteConfig>,
    pub s3: Option<S3Config>,
    pub upload_max_bytes: usize,
    /// Capacity reported as `all` by the space summary.
    pub storage_quota_bytes: u64,
    /// Capacity used by the usage view.
    pub display_quota_bytes: u64,
    pub shared_candidate_limit: u32,
    pub is_production: bool,
}

fn non_empty_var<F>(var: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed_var<F, T>(var: &F, key: &str) -> anyhow::Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match non_empty_var(var, key) {
        Some(raw) => match raw.parse() {
            Ok(v) => Ok(Some(v)),
            Err(_) => anyhow::bail!("{key} must be a non-negative integer, got '{raw}'"),
        },
        None => Ok(None),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| non_empty_var(&var, key);

        let api_port = parsed_var(&var, "API_PORT")?.unwrap_or(8888);
        let frontend_url = non_empty("FRONTEND_URL");
        // HS256 secret in PEM or bare string (either is accepted)
        let jwt_secret_pem = non_empty("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.into());
        let document_backend = match non_empty("DOCUMENT_BACKEND") {
            Some(v) => v.parse()?,
            None => DocumentBackend::Appwrite,
        };
        let object_backend = match non_empty("OBJECT_BACKEND") {
            Some(v) => v.parse()?,
            None => ObjectBackend::Appwrite,
        };
        let database_url = non_empty("DATABASE_URL");

        let appwrite = match (
            non_empty("APPWRITE_ENDPOINT"),
            non_empty("APPWRITE_PROJECT_ID"),
            non_empty("APPWRITE_API_KEY"),
        ) {
            (Some(endpoint), Some(project_id), Some(api_key)) => Some(AppwriteConfig {
                endpoint,
                project_id,
                api_key,
                database_id: non_empty("APPWRITE_DATABASE_ID").unwrap_or_default(),
                files_collection_id: non_empty("APPWRITE_FILES_COLLECTION_ID")
                    .unwrap_or_default(),
                users_collection_id: non_empty("APPWRITE_USERS_COLLECTION_ID")
                    .unwrap_or_default(),
                bucket_id: non_empty("APPWRITE_BUCKET_ID").unwrap_or_default(),
            }),
            _ => None,
        };

        let s3 = non_empty("S3_BUCKET").map(|bucket| S3Config {
            bucket,
            region: non_empty("S3_REGION"),
            endpoint: non_empty("S3_ENDPOINT"),
            access_key: non_empty("S3_ACCESS_KEY"),
            secret_key: non_empty("S3_SECRET_KEY"),
            use_path_style: non_empty("S3_USE_PATH_STYLE")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(true),
            public_url: non_empty("S3_PUBLIC_URL").map(|v| v.trim_end_matches('/').to_string()),
        });

        let upload_max_bytes = parsed_var(&var, "UPLOAD_MAX_BYTES")?.unwrap_or(100 * 1024 * 1024);
        let storage_quota_bytes = parsed_var(&var, "STORAGE_QUOTA_BYTES")?.unwrap_or(2 * 1024 * 1024 * 1024);
        let display_quota_bytes = parsed_var(&var, "DISPLAY_QUOTA_BYTES")?.unwrap_or(9 * 1024 * 1024 * 1024);
        let shared_candidate_limit = parsed_var(&var, "SHARED_CANDIDATE_LIMIT")?.unwrap_or(1000);
        let is_production = matches!(
            var("RUST_ENV").as_deref(),
            Some("production") | Some("prod")
        );

        // Production hardening: require proper FRONTEND_URL and robust secrets
        if is_production {
            if !frontend_url
                .as_deref()
                .is_some_and(|u| u.starts_with("http"))
            {
                anyhow::bail!(
                    "FRONTEND_URL must be set to a full origin in production (e.g., https://app.example.com)"
                );
            }
            if jwt_secret_pem == DEV_JWT_SECRET || jwt_secret_pem.len() < 16 {
                anyhow::bail!("JWT_SECRET must be set to a strong secret in production");
            }
        }

        let cfg = Self {
            api_port,
            frontend_url,
            jwt_secret_pem,
            document_backend,
            object_backend,
            database_url,
            appwrite,
            s3,
            upload_max_bytes,
            storage_quota_bytes,
            display_quota_bytes,
            shared_candidate_limit,
            is_production,
        };
        cfg.validate_backends()?;
        Ok(cfg)
    }

    fn validate_backends(&self) -> anyhow::Result<()> {
        let needs_appwrite = self.document_backend == DocumentBackend::Appwrite
            || self.object_backend == ObjectBackend::Appwrite;
        if needs_appwrite && self.appwrite.is_none() {
            anyhow::bail!(
                "APPWRITE_ENDPOINT, APPWRITE_PROJECT_ID and APPWRITE_API_KEY are required for the Appwrite backend"
            );
        }
        if self.document_backend == DocumentBackend::Postgres && self.database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required when DOCUMENT_BACKEND=postgres");
        }
        if self.object_backend == ObjectBackend::S3 && self.s3.is_none() {
            anyhow::bail!("S3_BUCKET is required when OBJECT_BACKEND=s3");
        }
        if self.shared_candidate_limit == 0 {
            anyhow::bail!("SHARED_CANDIDATE_LIMIT must be greater than zero");
        }
        if self.is_production
            && (self.document_backend == DocumentBackend::Memory
                || self.object_backend == ObjectBackend::Memory)
        {
            anyhow::bail!("memory backends are not allowed in production");
        }
        Ok(())
    }
}
