use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::{
    error::{IndicatorError, Result},
    structs::{Membership, OrgId, Organization, Publication},
};

pub trait PublicationSource: Send + Sync {
    fn publications_by_organization(
        &self,
        org: OrgId,
        include_sub_organizations: bool,
    ) -> Result<Vec<Publication>>;

    fn conference_papers_by_organization(
        &self,
        org: OrgId,
        include_sub_organizations: bool,
    ) -> Result<Vec<Publication>> {
        let mut pubs = self.publications_by_organization(org, include_sub_organizations)?;
        pubs.retain(|p| p.kind.is_conference_paper());
        Ok(pubs)
    }

    fn journal_papers_by_organization(
        &self,
        org: OrgId,
        include_sub_organizations: bool,
        include_ranking_fields: bool,
    ) -> Result<Vec<Publication>> {
        let mut pubs = self.publications_by_organization(org, include_sub_organizations)?;
        pubs.retain(|p| p.kind.is_journal_paper());
        if !include_ranking_fields {
            pubs.iter_mut().for_each(Publication::strip_ranking);
        }
        Ok(pubs)
    }
}

pub trait MembershipSource: Send + Sync {
    fn memberships_by_organization(
        &self,
        org: OrgId,
        include_sub_organizations: bool,
    ) -> Result<Vec<Membership>>;
}

pub trait OrganizationSource: Send + Sync {
    fn organization(&self, org: OrgId) -> Result<Organization>;
}

/// Everything the indicators read, held in memory.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Store {
    organizations: Vec<Organization>,
    publications: Vec<Publication>,
    memberships: Vec<Membership>,
}

impl Store {
    pub fn new(
        organizations: Vec<Organization>,
        publications: Vec<Publication>,
        memberships: Vec<Membership>,
    ) -> Self {
        Self {
            organizations,
            publications,
            memberships,
        }
    }

    pub fn organizations(&self) -> &[Organization] {
        &self.organizations
    }

    pub fn publications(&self) -> &[Publication] {
        &self.publications
    }

    pub fn memberships(&self) -> &[Membership] {
        &self.memberships
    }

    pub fn publication_count(&self) -> usize {
        self.publications.len()
    }

    pub fn membership_count(&self) -> usize {
        self.memberships.len()
    }

    pub fn add_organization(&mut self, org: Organization) {
        self.organizations.push(org);
    }

    pub fn add_publication(&mut self, publication: Publication) {
        self.publications.push(publication);
    }

    pub fn add_membership(&mut self, membership: Membership) {
        self.memberships.push(membership);
    }

    /// The organization and, when asked, all of its descendants.
    pub fn organization_scope(&self, org: OrgId, include_sub: bool) -> Result<HashSet<OrgId>> {
        if !self.organizations.iter().any(|o| o.id == org) {
            return Err(IndicatorError::UnknownOrganization(org));
        }
        let mut scope = HashSet::new();
        scope.insert(org);
        if !include_sub {
            return Ok(scope);
        }
        let mut children: HashMap<OrgId, Vec<OrgId>> = HashMap::new();
        for o in &self.organizations {
            if let Some(parent) = o.parent {
                children.entry(parent).or_default().push(o.id);
            }
        }
        let mut stack = vec![org];
        while let Some(current) = stack.pop() {
            for child in children.get(&current).into_iter().flatten() {
                //parent links may contain cycles
                if scope.insert(*child) {
                    stack.push(*child);
                }
            }
        }
        Ok(scope)
    }
}

impl PublicationSource for Store {
    fn publications_by_organization(
        &self,
        org: OrgId,
        include_sub_organizations: bool,
    ) -> Result<Vec<Publication>> {
        let scope = self.organization_scope(org, include_sub_organizations)?;
        Ok(self
            .publications
            .iter()
            .filter(|p| p.organizations.iter().any(|o| scope.contains(o)))
            .cloned()
            .collect())
    }
}

impl MembershipSource for Store {
    fn memberships_by_organization(
        &self,
        org: OrgId,
        include_sub_organizations: bool,
    ) -> Result<Vec<Membership>> {
        let scope = self.organization_scope(org, include_sub_organizations)?;
        Ok(self
            .memberships
            .iter()
            .filter(|m| scope.contains(&m.organization_id))
            .cloned()
            .collect())
    }
}

impl OrganizationSource for Store {
    fn organization(&self, org: OrgId) -> Result<Organization> {
        self.organizations
            .iter()
            .find(|o| o.id == org)
            .cloned()
            .ok_or(IndicatorError::UnknownOrganization(org))
    }
}
