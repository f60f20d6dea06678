//! Routing of qualified variable names to the owning component.
//!
//! Reads and metadata queries for a name whose component is not registered return
//! `Ok(None)`. Writes follow the composite's [`UnknownComponentPolicy`].
//! Variable access is not tied to the lifecycle phase, so values can still be inspected after
//! a failure.

use crate::component::Component;
use crate::config::UnknownComponentPolicy;
use crate::errors::{CouplerError, CouplerResult};
use crate::grid::GridType;
use crate::naming::{qualify, QualifiedName};
use crate::registry::RegisteredComponent;
use crate::time::Time;
use crate::value::{Value, VarType};
use tracing::{debug, warn};

use super::runtime::Composite;

impl Composite {
    /// The registered component owning `name` and the component's local name
    pub fn resolve<'a>(&self, name: &'a str) -> Option<(&RegisteredComponent, &'a str)> {
        let qualified = QualifiedName::split(name)?;
        self.registry
            .get(qualified.component)
            .map(|registered| (registered, qualified.variable))
    }

    fn query<T>(
        &self,
        name: &str,
        f: impl FnOnce(&dyn Component, &str) -> CouplerResult<T>,
    ) -> CouplerResult<Option<T>> {
        match self.resolve(name) {
            Some((registered, variable)) => f(registered.component(), variable).map(Some),
            None => {
                debug!(variable = %name, "No registered component owns the variable");
                Ok(None)
            }
        }
    }

    fn modify(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut dyn Component, &str) -> CouplerResult<()>,
    ) -> CouplerResult<()> {
        let policy = self.settings.unknown_component;
        let qualified = match QualifiedName::split(name) {
            Some(qualified) => qualified,
            None => {
                return unresolved_write(
                    policy,
                    name,
                    CouplerError::InvalidQualifiedName(name.to_string()),
                )
            }
        };
        match self.registry.get_mut(qualified.component) {
            Some(registered) => f(registered.component_mut(), qualified.variable),
            None => unresolved_write(
                policy,
                name,
                CouplerError::UnknownComponent(qualified.component.to_string()),
            ),
        }
    }

    /// Comma separated names reported by the components, in registration order
    pub fn component_name(&self) -> String {
        self.registry
            .iter()
            .map(|registered| registered.component().component_name())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Qualified names of every component input
    pub fn input_var_names(&self) -> Vec<String> {
        self.qualified_names(|component| component.input_var_names())
    }

    /// Qualified names of every component output
    pub fn output_var_names(&self) -> Vec<String> {
        self.qualified_names(|component| component.output_var_names())
    }

    /// Qualified names of every component attribute, as `<component>/<section>:<option>`
    pub fn attribute_names(&self) -> Vec<String> {
        self.qualified_names(|component| component.attribute_names())
    }

    fn qualified_names(&self, names: impl Fn(&dyn Component) -> Vec<String>) -> Vec<String> {
        self.registry
            .iter()
            .flat_map(|registered| {
                names(registered.component())
                    .into_iter()
                    .map(move |name| qualify(registered.id(), &name))
            })
            .collect()
    }

    pub fn get_attribute_value(&self, name: &str) -> CouplerResult<Option<String>> {
        self.query(name, |c, attribute| c.get_attribute_value(attribute))
    }

    pub fn set_attribute_value(&mut self, name: &str, value: &str) -> CouplerResult<()> {
        self.modify(name, |c, attribute| c.set_attribute_value(attribute, value))
    }

    pub fn get_value(&self, name: &str) -> CouplerResult<Option<Value>> {
        self.query(name, |c, variable| c.get_value(variable))
    }

    pub fn get_value_at_indices(
        &self,
        name: &str,
        indices: &[Vec<usize>],
    ) -> CouplerResult<Option<Value>> {
        self.query(name, |c, variable| c.get_value_at_indices(variable, indices))
    }

    pub fn set_value(&mut self, name: &str, value: &Value) -> CouplerResult<()> {
        self.modify(name, |c, variable| c.set_value(variable, value))
    }

    pub fn set_value_at_indices(
        &mut self,
        name: &str,
        indices: &[Vec<usize>],
        value: &Value,
    ) -> CouplerResult<()> {
        self.modify(name, |c, variable| {
            c.set_value_at_indices(variable, indices, value)
        })
    }

    pub fn var_type(&self, name: &str) -> CouplerResult<Option<VarType>> {
        self.query(name, |c, variable| c.var_type(variable))
    }

    pub fn var_rank(&self, name: &str) -> CouplerResult<Option<usize>> {
        self.query(name, |c, variable| c.var_rank(variable))
    }

    pub fn var_size(&self, name: &str) -> CouplerResult<Option<usize>> {
        self.query(name, |c, variable| c.var_size(variable))
    }

    pub fn var_nbytes(&self, name: &str) -> CouplerResult<Option<usize>> {
        self.query(name, |c, variable| c.var_nbytes(variable))
    }

    pub fn var_units(&self, name: &str) -> CouplerResult<Option<String>> {
        self.query(name, |c, variable| c.var_units(variable))
    }

    pub fn grid_type(&self, name: &str) -> CouplerResult<Option<GridType>> {
        self.query(name, |c, variable| c.grid_type(variable))
    }

    pub fn grid_shape(&self, name: &str) -> CouplerResult<Option<Vec<usize>>> {
        self.query(name, |c, variable| c.grid_shape(variable))
    }

    pub fn grid_spacing(&self, name: &str) -> CouplerResult<Option<Vec<f64>>> {
        self.query(name, |c, variable| c.grid_spacing(variable))
    }

    pub fn grid_origin(&self, name: &str) -> CouplerResult<Option<Vec<f64>>> {
        self.query(name, |c, variable| c.grid_origin(variable))
    }

    pub fn grid_x(&self, name: &str) -> CouplerResult<Option<Vec<f64>>> {
        self.query(name, |c, variable| c.grid_x(variable))
    }

    pub fn grid_y(&self, name: &str) -> CouplerResult<Option<Vec<f64>>> {
        self.query(name, |c, variable| c.grid_y(variable))
    }

    pub fn grid_z(&self, name: &str) -> CouplerResult<Option<Vec<f64>>> {
        self.query(name, |c, variable| c.grid_z(variable))
    }

    pub fn grid_connectivity(&self, _name: &str) -> CouplerResult<Vec<usize>> {
        Err(CouplerError::Unsupported("grid_connectivity"))
    }

    pub fn grid_offset(&self, _name: &str) -> CouplerResult<Vec<usize>> {
        Err(CouplerError::Unsupported("grid_offset"))
    }

    /// Current time of the component owning `name`
    pub fn component_time(&self, name: &str) -> CouplerResult<Option<Time>> {
        self.query(name, |c, _| Ok(c.current_time()))
    }
}

fn unresolved_write(
    policy: UnknownComponentPolicy,
    name: &str,
    error: CouplerError,
) -> CouplerResult<()> {
    match policy {
        UnknownComponentPolicy::Ignore => {
            warn!(variable = %name, "Ignoring write to a variable without a registered component");
            Ok(())
        }
        UnknownComponentPolicy::Error => Err(error),
    }
}
