/// Build constants for the deploy action package.
/// Values come from compile-time environment variables with defaults.

/// Source control information.
pub struct Source;

impl Source {
    /// The commit hash from which this binary was built.
    /// Set via the `DEPLOY_ACTION_COMMIT_HASH` env var at compile time, or "N/A".
    pub const COMMIT_HASH: &'static str = match option_env!("DEPLOY_ACTION_COMMIT_HASH") {
        Some(h) => h,
        None => "N/A",
    };
}

/// Package metadata.
#[derive(Debug, Clone)]
pub struct ActionPackage;

impl ActionPackage {
    /// Product name used in the `User-Agent` header.
    pub const PRODUCT: &'static str = "deploy-action";

    /// The semantic version, pulled from `CARGO_PKG_VERSION`.
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    /// `User-Agent` value for outgoing API requests.
    pub fn user_agent() -> String {
        format!("{}/{}", Self::PRODUCT, Self::VERSION)
    }
}
