use crate::error::PortalError;
use serde::{Deserialize, Serialize};

/// A tenant the signed-in user is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Organization {
    pub id: String,
    pub name: String,
}

impl Organization {
    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A committed organization selection. The generation increases with every
/// distinct selection, so work started under an older one can be recognised
/// and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub organization: Organization,
    pub generation: u64,
}

/// Holds the organization list and the single current selection
#[derive(Debug, Default)]
pub struct OrgSelector {
    organizations: Vec<Organization>,
    current: Option<Organization>,
    generation: u64,
    loaded: bool,
}

impl OrgSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the known organizations.
    ///
    /// The current selection survives if it is still listed; otherwise the
    /// first organization becomes current. Returns the new selection only
    /// when it changed.
    pub fn load(&mut self, organizations: Vec<Organization>) -> Option<Selection> {
        self.organizations = organizations;
        self.loaded = true;

        let still_listed = self
            .current
            .as_ref()
            .and_then(|current| self.find(&current.id))
            .cloned();

        match still_listed {
            Some(org) => {
                // Pick up a renamed organization without starting a new generation
                self.current = Some(org);
                None
            }
            None => match self.organizations.first().cloned() {
                Some(first) => Some(self.commit(first)),
                None => {
                    if self.current.take().is_some() {
                        self.generation += 1;
                    }
                    None
                }
            },
        }
    }

    /// Select an organization by id. Selecting the current one is a no-op.
    pub fn select(&mut self, org_id: &str) -> Result<Option<Selection>, PortalError> {
        if self.current.as_ref().is_some_and(|c| c.id == org_id) {
            return Ok(None);
        }
        let org = self
            .find(org_id)
            .cloned()
            .ok_or_else(|| PortalError::not_found(format!("organization {org_id}")))?;
        Ok(Some(self.commit(org)))
    }

    pub fn current(&self) -> Option<&Organization> {
        self.current.as_ref()
    }

    pub fn organizations(&self) -> &[Organization] {
        &self.organizations
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The current selection, if any
    pub fn selection(&self) -> Option<Selection> {
        self.current.clone().map(|organization| Selection {
            organization,
            generation: self.generation,
        })
    }

    /// Whether `selection` is still the live one
    pub fn is_current(&self, selection: &Selection) -> bool {
        self.generation == selection.generation
            && self
                .current
                .as_ref()
                .is_some_and(|c| c.id == selection.organization.id)
    }

    fn find(&self, org_id: &str) -> Option<&Organization> {
        self.organizations.iter().find(|org| org.id == org_id)
    }

    fn commit(&mut self, organization: Organization) -> Selection {
        self.generation += 1;
        self.current = Some(organization.clone());
        Selection {
            organization,
            generation: self.generation,
        }
    }
}
