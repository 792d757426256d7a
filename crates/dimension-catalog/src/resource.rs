//! Resources: data artifacts addressed by dimension variables.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::graph::NodeId;
use crate::time::ValidTime;
use crate::variable::Variable;

/// A data artifact (forecast image, sounding profile, ...) identified by
/// one variable per relevant dimension.
///
/// Resources compare by value: two resources with the same variables,
/// datetime and uri are the same resource. The defining variables are
/// fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Resource {
    variables: Vec<Variable>,
    datetime: Option<DateTime<Utc>>,
    uri: Option<String>,
}

impl Resource {
    pub fn new(variables: impl IntoIterator<Item = Variable>) -> Self {
        Self::builder().variables(variables).build()
    }

    pub fn builder() -> ResourceBuilder {
        ResourceBuilder::default()
    }

    /// Defining variables, ordered by collection.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// The variable this resource carries for a collection, if any.
    pub fn variable_for(&self, collection: NodeId) -> Option<&Variable> {
        self.variables.iter().find(|v| v.collection() == collection)
    }

    pub fn is_defined_by(&self, variable: &Variable) -> bool {
        self.variables.contains(variable)
    }

    /// True if every given variable is one of this resource's variables.
    pub fn is_defined_by_all<'a, I>(&self, variables: I) -> bool
    where
        I: IntoIterator<Item = &'a Variable>,
    {
        variables.into_iter().all(|v| self.is_defined_by(v))
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.datetime
    }

    /// Location of the payload, resolved by the caller.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }
}

/// Builder for [`Resource`].
#[derive(Debug, Default)]
pub struct ResourceBuilder {
    variables: Vec<Variable>,
    datetime: Option<DateTime<Utc>>,
    uri: Option<String>,
}

impl ResourceBuilder {
    pub fn variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn variables(mut self, variables: impl IntoIterator<Item = Variable>) -> Self {
        self.variables.extend(variables);
        self
    }

    pub fn datetime(mut self, datetime: DateTime<Utc>) -> Self {
        self.datetime = Some(datetime);
        self
    }

    /// Set the datetime from a run time plus forecast offset.
    pub fn valid_time(self, valid_time: ValidTime) -> Self {
        self.datetime(valid_time.valid_datetime())
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn build(self) -> Resource {
        let mut variables = self.variables;
        variables.sort();
        variables.dedup();
        Resource {
            variables,
            datetime: self.datetime,
            uri: self.uri,
        }
    }
}
