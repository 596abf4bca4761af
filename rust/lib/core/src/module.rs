use axum::Router;

/// A service module that contributes HTTP routes.
///
/// Each business module (parking, transit, ...) implements this trait
/// to register its API endpoints. The binary entry point collects all
/// modules and mounts their routes under `/api`.
pub trait Module: Send + Sync {
    /// Module name, used for logging.
    fn name(&self) -> &str;

    /// Return the module's routes, relative to `/api`.
    fn routes(&self) -> Router;
}
