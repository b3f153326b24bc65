// Plugins extend an application at registration time

use crate::{App, Error};

/// A named unit of setup applied to an [`App`].
///
/// A plugin may register routes, middleware, hooks, state and decorators.
/// Registering a second plugin with the same name does nothing; a plugin
/// whose dependencies are not registered yet is rejected.
///
/// ```
/// use arbor_core::{App, Error, Plugin};
///
/// struct Version(&'static str);
///
/// impl Plugin for Version {
///     fn name(&self) -> &str {
///         "version"
///     }
///
///     fn setup(&self, app: &mut App) -> Result<(), Error> {
///         app.decorate("version", self.0.to_string());
///         Ok(())
///     }
/// }
///
/// # fn main() -> Result<(), Error> {
/// let mut app = App::new();
/// app.register(Version("1.2.0"))?;
/// assert!(app.has_plugin("version"));
/// # Ok(())
/// # }
/// ```
pub trait Plugin {
    fn name(&self) -> &str;

    /// Names of plugins that must be registered first
    fn dependencies(&self) -> Vec<&str> {
        Vec::new()
    }

    fn setup(&self, app: &mut App) -> Result<(), Error>;
}

/// Plugin built from a closure
pub struct FnPlugin<F> {
    name: String,
    dependencies: Vec<String>,
    setup: F,
}

/// Build a plugin from a name and a setup function
pub fn plugin<F>(name: impl Into<String>, setup: F) -> FnPlugin<F>
where
    F: Fn(&mut App) -> Result<(), Error>,
{
    FnPlugin {
        name: name.into(),
        dependencies: Vec::new(),
        setup,
    }
}

impl<F> FnPlugin<F> {
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }
}

impl<F> Plugin for FnPlugin<F>
where
    F: Fn(&mut App) -> Result<(), Error>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<&str> {
        self.dependencies.iter().map(String::as_str).collect()
    }

    fn setup(&self, app: &mut App) -> Result<(), Error> {
        (self.setup)(app)
    }
}
