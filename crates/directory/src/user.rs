use serde::{Deserialize, Serialize};

use assetdesk_auth::{Principal, Role};
use assetdesk_core::{DomainError, DomainResult, Entity, UserId};

/// Subscription payment state of an HR account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

/// A registered user.
///
/// Employees start unaffiliated (`companyName` unset) until an HR user adds
/// them; from then on `Added_By` names the HR user whose inventory they see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,

    pub email: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub photo: Option<String>,

    #[serde(default)]
    pub role: Option<Role>,

    #[serde(rename = "companyName", default)]
    pub company_name: Option<String>,

    #[serde(rename = "companyLogo", default)]
    pub company_logo: Option<String>,

    #[serde(default)]
    pub affiliate: Option<bool>,

    #[serde(rename = "Added_By", default)]
    pub added_by: Option<String>,

    /// Subscription tier (maximum employee count package).
    #[serde(default)]
    pub category: Option<i64>,

    #[serde(default)]
    pub payment: Option<PaymentStatus>,
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// Signup payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(rename = "companyName", default)]
    pub company_name: Option<String>,
    #[serde(rename = "companyLogo", default)]
    pub company_logo: Option<String>,
    #[serde(default)]
    pub category: Option<i64>,
    #[serde(default)]
    pub payment: Option<PaymentStatus>,
}

impl User {
    pub fn register(id: UserId, new: NewUser) -> DomainResult<Self> {
        let email = new.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::validation("email must be a valid address"));
        }

        Ok(Self {
            id,
            email: email.to_string(),
            name: new.name,
            photo: new.photo,
            role: new.role,
            company_name: new.company_name,
            company_logo: new.company_logo,
            affiliate: None,
            added_by: None,
            category: new.category,
            payment: new.payment,
        })
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.email.clone(), self.role)
    }

    pub fn is_hr(&self) -> bool {
        self.role == Some(Role::Hr)
    }

    pub fn is_employee(&self) -> bool {
        self.role == Some(Role::Employee)
    }

    /// Not yet part of any company and not an HR account.
    pub fn is_unaffiliated(&self) -> bool {
        self.company_name.is_none() && !self.is_hr()
    }

    /// Email of the HR user whose inventory this user works against.
    ///
    /// HR users own their tenant; employees belong to whoever added them.
    pub fn tenant_owner(&self) -> Option<&str> {
        if self.is_hr() {
            Some(&self.email)
        } else {
            self.added_by.as_deref()
        }
    }

    pub fn assign_company(&mut self, assignment: &CompanyAssignment, added_by: &str) {
        self.company_name = Some(assignment.company_name.clone());
        self.company_logo = assignment.company_logo.clone();
        self.affiliate = Some(assignment.affiliate.unwrap_or(true));
        self.added_by = Some(added_by.to_string());
    }

    /// Drop the company affiliation; `Added_By` is cleared with it.
    pub fn remove_from_company(&mut self) {
        self.company_name = None;
        self.company_logo = None;
        self.affiliate = None;
        self.added_by = None;
    }

    pub fn update_subscription(&mut self, update: &SubscriptionUpdate) {
        self.category = Some(update.category);
        self.payment = Some(update.payment);
    }
}

/// HR request to add a user to its company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyAssignment {
    #[serde(rename = "companyName")]
    pub company_name: String,
    #[serde(rename = "companyLogo", default)]
    pub company_logo: Option<String>,
    #[serde(default)]
    pub affiliate: Option<bool>,
}

impl CompanyAssignment {
    pub fn validate(&self) -> DomainResult<()> {
        if self.company_name.trim().is_empty() {
            return Err(DomainError::validation("companyName cannot be empty"));
        }
        Ok(())
    }
}

/// Subscription tier change after checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionUpdate {
    pub category: i64,
    pub payment: PaymentStatus,
}

impl SubscriptionUpdate {
    pub fn validate(&self) -> DomainResult<()> {
        if self.category <= 0 {
            return Err(DomainError::validation("category must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signup(email: &str, role: Option<Role>) -> User {
        User::register(
            UserId::new(),
            NewUser {
                email: email.into(),
                name: Some("Ann".into()),
                photo: None,
                role,
                company_name: None,
                company_logo: None,
                category: None,
                payment: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn register_requires_an_email_address() {
        let err = User::register(
            UserId::new(),
            NewUser {
                email: "not-an-email".into(),
                name: None,
                photo: None,
                role: None,
                company_name: None,
                company_logo: None,
                category: None,
                payment: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn tenant_owner_follows_role() {
        let hr = signup("hr@acme.io", Some(Role::Hr));
        assert_eq!(hr.tenant_owner(), Some("hr@acme.io"));

        let mut emp = signup("a@x.com", Some(Role::Employee));
        assert_eq!(emp.tenant_owner(), None);
        assert!(emp.is_unaffiliated());

        emp.assign_company(
            &CompanyAssignment {
                company_name: "Acme".into(),
                company_logo: Some("logo.png".into()),
                affiliate: None,
            },
            "hr@acme.io",
        );
        assert_eq!(emp.tenant_owner(), Some("hr@acme.io"));
        assert_eq!(emp.affiliate, Some(true));
        assert!(!emp.is_unaffiliated());

        emp.remove_from_company();
        assert_eq!(emp.tenant_owner(), None);
        assert!(emp.company_name.is_none());
    }

    #[test]
    fn hr_is_never_unaffiliated() {
        assert!(!signup("hr@acme.io", Some(Role::Hr)).is_unaffiliated());
        assert!(signup("nobody@x.com", None).is_unaffiliated());
    }

    #[test]
    fn subscription_update_validates_category() {
        let bad = SubscriptionUpdate { category: 0, payment: PaymentStatus::Paid };
        assert!(bad.validate().is_err());

        let mut hr = signup("hr@acme.io", Some(Role::Hr));
        let good = SubscriptionUpdate { category: 10, payment: PaymentStatus::Paid };
        good.validate().unwrap();
        hr.update_subscription(&good);
        assert_eq!(hr.category, Some(10));
        assert_eq!(hr.payment, Some(PaymentStatus::Paid));
    }

    #[test]
    fn wire_names_match_documents() {
        let mut user = signup("a@x.com", Some(Role::Employee));
        user.company_name = Some("Acme".into());
        user.added_by = Some("hr@acme.io".into());

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["companyName"], json!("Acme"));
        assert_eq!(json["Added_By"], json!("hr@acme.io"));
        assert_eq!(json["role"], json!("employee"));
    }
}
