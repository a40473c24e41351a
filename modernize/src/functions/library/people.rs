//! People lookup against the site's hidden user list

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::param;
use crate::context::TransformationContext;
use crate::functions::coerce::{Args, ParamType};
use crate::functions::definition::FunctionOutput;
use crate::functions::registry::{BuiltinFunction, FunctionDoc, FunctionKind, FunctionResult};
use crate::source::{PrincipalType, UserQuery, UserRecord};

/// Claim prefixes used by group principals
const GROUP_CLAIM_PREFIXES: &[&str] = &[
    "c:0(.s|true",
    "c:0-.f|rolemanager|",
    "c:0t.c|tenant|",
    "c:0o.c|federateddirectoryclaimprovider|",
    "c:0+.w|",
];

/// On-premises domain group SID
static GROUP_SID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)s-1-5-21(-\d+){4}$").expect("sid pattern is valid"));

/// A resolved (or best-effort) person
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersonInfo {
    pub name: String,
    pub email: String,
    pub upn: String,
    pub role: String,
    pub department: String,
    pub phone: String,
    pub sip: String,
    pub is_group: bool,
}

impl PersonInfo {
    fn from_record(ctx: &TransformationContext, record: &UserRecord) -> Self {
        let is_group = record.principal_type != PrincipalType::User || is_group_login(&record.login_name);
        let upn = if is_group {
            record.login_name.clone()
        } else {
            ctx.user_mapper().map_user(bare_login(&record.login_name))
        };
        PersonInfo {
            name: record.name.clone(),
            email: record.email.clone(),
            upn,
            role: record.job_title.clone(),
            department: record.department.clone(),
            phone: record.work_phone.clone(),
            sip: record.sip_address.clone(),
            is_group,
        }
    }

    /// Best effort from the raw login when the user list has no entry
    fn from_login(ctx: &TransformationContext, login: &str) -> Self {
        let is_group = is_group_login(login);
        let bare = bare_login(login);
        let name = bare.rsplit('\\').next().unwrap_or(bare).to_string();
        let email = if name.contains('@') { name.clone() } else { String::new() };
        let upn = if is_group {
            login.to_string()
        } else {
            ctx.user_mapper().map_user(bare)
        };
        PersonInfo {
            name,
            email,
            upn,
            is_group,
            ..Default::default()
        }
    }

    pub fn into_output(self) -> FunctionOutput {
        FunctionOutput::map([
            ("PersonName", self.name),
            ("PersonEmail", self.email),
            ("PersonUPN", self.upn),
            ("PersonRole", self.role),
            ("PersonDepartment", self.department),
            ("PersonPhone", self.phone),
            ("PersonSip", self.sip),
            ("PersonIsGroup", self.is_group.to_string()),
        ])
    }
}

/// Login without its claims prefix: `i:0#.f|membership|anna@contoso.com` -> `anna@contoso.com`
fn bare_login(login: &str) -> &str {
    login.rsplit('|').next().unwrap_or(login).trim()
}

fn is_group_login(login: &str) -> bool {
    let lower = login.trim().to_ascii_lowercase();
    GROUP_CLAIM_PREFIXES.iter().any(|p| lower.starts_with(p)) || GROUP_SID.is_match(&lower)
}

/// Resolve a login name or user id; `None` only for empty input
pub fn resolve_person(ctx: &TransformationContext, person: &str) -> Option<PersonInfo> {
    let person = person.trim();
    if person.is_empty() {
        return None;
    }
    let query = UserQuery::from_input(person);
    let found = ctx
        .cache()
        .users
        .get_or_try_insert_with(query.cache_key(), || ctx.source().find_users(&query));

    match found {
        Ok(records) if !records.is_empty() => Some(PersonInfo::from_record(ctx, &records[0])),
        Ok(_) => {
            log::warn!("User '{}' not found in the user list, using the login as is", person);
            Some(PersonInfo::from_login(ctx, person))
        }
        Err(e) => {
            log::warn!("Lookup of user '{}' failed: {}", person, e);
            Some(PersonInfo::from_login(ctx, person))
        }
    }
}

fn lookup_person(ctx: &TransformationContext, args: &Args) -> FunctionResult {
    match resolve_person(ctx, &args.text(0)) {
        Some(info) => Ok(info.into_output()),
        None => Ok(FunctionOutput::empty_map()),
    }
}

pub(super) const FUNCTIONS: &[BuiltinFunction] = &[BuiltinFunction {
    name: "LookupPerson",
    kind: FunctionKind::Function,
    doc: FunctionDoc {
        description: "Looks up a person by login name or user id. Unknown users fall back to what can be read from the login name.",
        example: "LookupPerson({PersonEmail})",
        params: &[param("person", ParamType::String, "Login name or user id")],
        returns: "PersonName, PersonEmail, PersonUPN, PersonRole, PersonDepartment, PersonPhone, PersonSip and PersonIsGroup",
    },
    handler: lookup_person,
}];
