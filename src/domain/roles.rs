//! Role resolution and section access control.

use primitive_types::H256;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::crypto::hashing::role_id;
use crate::domain::ledger::LedgerReader;
use crate::domain::model::Address;
use crate::error::{PortalError, PortalResult};

/// Ledger role names, in probe priority order after `DEFAULT_ADMIN_ROLE`.
pub const PLANT_OPERATOR_ADMIN: &str = "PLANT_OPERATOR_ADMIN";
pub const CERTIFICATION_OFFICER: &str = "CERTIFICATION_OFFICER";
pub const REGULATORY_AUTHORITY: &str = "REGULATORY_AUTHORITY";
pub const MANUFACTURER: &str = "MANUFACTURER";
pub const LABORATORY: &str = "LABORATORY";
pub const PLANT_OPERATOR: &str = "PLANT_OPERATOR";

/// The portal role of an account, derived from its ledger role memberships.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    PlantOperator,
    CertificationOfficer,
    RegulatoryAuthority,
    Manufacturer,
    Laboratory,
    NoRole,
}

impl Role {
    pub const ASSIGNABLE: [Role; 6] = [
        Role::Admin,
        Role::PlantOperator,
        Role::CertificationOfficer,
        Role::RegulatoryAuthority,
        Role::Manufacturer,
        Role::Laboratory,
    ];

    /// Sections this role may open.
    pub fn sections(self) -> Vec<Section> {
        Section::ALL
            .into_iter()
            .filter(|section| is_granted(*section, Some(self)))
            .collect()
    }
}

/// `(ledger role id, portal role)` pairs in probe order, highest priority first.
pub fn probe_order() -> Vec<(H256, Role)> {
    vec![
        (H256::zero(), Role::Admin),
        (role_id(PLANT_OPERATOR_ADMIN), Role::PlantOperator),
        (role_id(CERTIFICATION_OFFICER), Role::CertificationOfficer),
        (role_id(REGULATORY_AUTHORITY), Role::RegulatoryAuthority),
        (role_id(MANUFACTURER), Role::Manufacturer),
        (role_id(LABORATORY), Role::Laboratory),
        (role_id(PLANT_OPERATOR), Role::PlantOperator),
    ]
}

pub struct RoleResolver {
    ledger: Arc<dyn LedgerReader>,
}

impl RoleResolver {
    pub fn new(ledger: Arc<dyn LedgerReader>) -> Self {
        Self { ledger }
    }

    /// Resolves the highest-priority role of `account`. No account resolves to `NoRole`.
    ///
    /// Probes run one at a time and stop at the first membership. A failed probe aborts
    /// the resolution.
    pub async fn resolve(&self, account: Option<Address>) -> PortalResult<Role> {
        let Some(account) = account else {
            return Ok(Role::NoRole);
        };
        for (role, resolved) in probe_order() {
            let member = self
                .ledger
                .has_role(role, account)
                .await
                .map_err(|e| PortalError::upstream("Failed to resolve account role.", &e))?;
            if member {
                tracing::debug!(account = ?account, role = ?resolved, "role resolved");
                return Ok(resolved);
            }
        }
        Ok(Role::NoRole)
    }
}

/// Portal sections subject to access control.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    Backoffice,
    Plants,
    Equipment,
    Users,
    Documents,
    Certificates,
    CertificationRequests,
    RegulatoryCertification,
    Create,
    Verify,
}

impl Section {
    pub const ALL: [Section; 10] = [
        Section::Backoffice,
        Section::Plants,
        Section::Equipment,
        Section::Users,
        Section::Documents,
        Section::Certificates,
        Section::CertificationRequests,
        Section::RegulatoryCertification,
        Section::Create,
        Section::Verify,
    ];

    /// Roles admitted to the section. Empty for public sections.
    pub fn allowed_roles(self) -> &'static [Role] {
        use Role::*;
        match self {
            Section::Backoffice | Section::Certificates => &Role::ASSIGNABLE,
            Section::Plants => &[Admin],
            Section::Equipment | Section::CertificationRequests => &[PlantOperator],
            Section::Users => &[Admin, PlantOperator, RegulatoryAuthority],
            Section::Documents => &[Manufacturer, Laboratory, CertificationOfficer],
            Section::RegulatoryCertification => &[RegulatoryAuthority],
            Section::Create => &[Laboratory, Manufacturer, PlantOperator],
            Section::Verify => &[],
        }
    }

    pub fn is_public(self) -> bool {
        matches!(self, Section::Verify)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Backoffice => "backoffice",
            Section::Plants => "plants",
            Section::Equipment => "equipment",
            Section::Users => "users",
            Section::Documents => "documents",
            Section::Certificates => "certificates",
            Section::CertificationRequests => "certification-requests",
            Section::RegulatoryCertification => "regulatory-certification",
            Section::Create => "create",
            Section::Verify => "verify",
        }
    }
}

impl std::str::FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Section::ALL
            .into_iter()
            .find(|section| section.as_str() == wanted)
            .ok_or_else(|| format!("unknown section '{}'", s))
    }
}

/// Access decision for `section`. `role` is `None` when no account is connected.
pub fn is_granted(section: Section, role: Option<Role>) -> bool {
    if section.is_public() {
        return true;
    }
    match role {
        None => false,
        Some(Role::Admin) => true,
        Some(role) => section.allowed_roles().contains(&role),
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct AccessDecision {
    pub section: Section,
    pub role: Role,
    pub granted: bool,
}

/// Gates sections by the resolved role of the connected account.
pub struct AccessGuard {
    resolver: RoleResolver,
}

impl AccessGuard {
    pub fn new(resolver: RoleResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &RoleResolver {
        &self.resolver
    }

    pub async fn check(
        &self,
        account: Option<Address>,
        section: Section,
    ) -> PortalResult<AccessDecision> {
        let role = self.resolver.resolve(account).await?;
        let connected = account.map(|_| role);
        Ok(AccessDecision {
            section,
            role,
            granted: is_granted(section, connected),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_id_is_zero_and_others_are_hashed() {
        let order = probe_order();
        assert_eq!(order[0], (H256::zero(), Role::Admin));
        assert_eq!(
            hex::encode(order[6].0.as_bytes()),
            "16ed3be25bcaf0afaa4a573e9e7529e09ade7e5a59bc9e8a4f023d6964a03e40"
        );
        assert_eq!(order[6].1, Role::PlantOperator);
        assert_eq!(order[1].1, Role::PlantOperator);
    }

    #[test]
    fn section_table() {
        use Role::*;
        assert!(is_granted(Section::Plants, Some(Admin)));
        assert!(!is_granted(Section::Plants, Some(PlantOperator)));
        assert!(is_granted(Section::Equipment, Some(PlantOperator)));
        assert!(!is_granted(Section::Equipment, Some(Manufacturer)));
        assert!(is_granted(Section::Users, Some(RegulatoryAuthority)));
        assert!(!is_granted(Section::Users, Some(Laboratory)));
        assert!(is_granted(Section::Documents, Some(CertificationOfficer)));
        assert!(is_granted(Section::RegulatoryCertification, Some(RegulatoryAuthority)));
        assert!(!is_granted(Section::RegulatoryCertification, Some(CertificationOfficer)));
        assert!(is_granted(Section::Create, Some(Laboratory)));
        assert!(!is_granted(Section::Create, Some(RegulatoryAuthority)));
        for role in Role::ASSIGNABLE {
            assert!(is_granted(Section::Backoffice, Some(role)));
            assert!(is_granted(Section::Certificates, Some(role)));
        }
    }

    #[test]
    fn admin_sees_everything_and_no_role_only_public() {
        assert_eq!(Role::Admin.sections(), Section::ALL.to_vec());
        assert_eq!(Role::NoRole.sections(), vec![Section::Verify]);
    }

    #[test]
    fn disconnected_accounts_only_reach_public_sections() {
        for section in Section::ALL {
            assert_eq!(is_granted(section, None), section.is_public());
        }
    }

    #[test]
    fn section_names_round_trip() {
        for section in Section::ALL {
            assert_eq!(section.as_str().parse::<Section>().unwrap(), section);
        }
        assert_eq!(
            "certification_requests".parse::<Section>().unwrap(),
            Section::CertificationRequests
        );
        assert!("admin-panel".parse::<Section>().is_err());
    }
}
