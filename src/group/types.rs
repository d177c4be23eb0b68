/// Group type definitions
///
/// Groups are reusable sets of people that can be assigned to flow steps.
/// Members are users identified by email.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A group as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub color: String,
    pub team_id: Option<String>,
    pub accept_any: bool,
    /// Members in the order they were supplied
    pub members: Vec<Member>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub email: String,
}

/// Validated create/update payload
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDraft {
    pub name: String,
    pub color: String,
    pub team_id: Option<String>,
    pub accept_any: bool,
    pub members: Vec<Member>,
}

impl GroupDraft {
    /// Validate an untyped request body
    pub fn from_body(body: &Value) -> StoreResult<Self> {
        let body = body
            .as_object()
            .ok_or_else(|| StoreError::validation("Request body must be a JSON object"))?;

        let name = match body.get("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
            _ => return Err(StoreError::validation("Group name is required and must be a non-empty string")),
        };

        let color = match body.get("color") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(color)) => color.clone(),
            Some(_) => return Err(StoreError::validation("color must be a string")),
        };

        let team_id = match body.get("team_id") {
            None | Some(Value::Null) => None,
            Some(Value::String(team_id)) => Some(team_id.clone()),
            Some(_) => return Err(StoreError::validation("team_id must be a string")),
        };

        let accept_any = match body.get("accept_any") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(flag)) => flag.as_f64().is_some_and(|n| n != 0.0),
            Some(_) => return Err(StoreError::validation("accept_any must be a boolean")),
        };

        let members = match body.get("members") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(members)) => members
                .iter()
                .enumerate()
                .map(|(index, member)| parse_member(index, member))
                .collect::<StoreResult<Vec<_>>>()?,
            Some(_) => return Err(StoreError::validation("members must be an array")),
        };

        Ok(Self {
            name,
            color,
            team_id,
            accept_any,
            members,
        })
    }
}

fn parse_member(index: usize, value: &Value) -> StoreResult<Member> {
    let email = value
        .get("email")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .ok_or_else(|| StoreError::validation(format!("Member at index {index} is missing an email")))?;

    Ok(Member {
        name: value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        email: email.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_body() {
        let draft = GroupDraft::from_body(&json!({
            "name": "Reviewers",
            "color": "#ff0000",
            "team_id": "t-1",
            "accept_any": true,
            "members": [{"name": "Ada", "email": " ada@example.com "}],
        }))
        .unwrap();

        assert_eq!(draft.name, "Reviewers");
        assert!(draft.accept_any);
        assert_eq!(draft.team_id.as_deref(), Some("t-1"));
        assert_eq!(draft.members[0].email, "ada@example.com");
    }

    #[test]
    fn defaults_optional_fields() {
        let draft = GroupDraft::from_body(&json!({"name": "Ops"})).unwrap();
        assert_eq!(draft.color, "");
        assert!(!draft.accept_any);
        assert!(draft.members.is_empty());
    }

    #[test]
    fn rejects_missing_name_and_member_email() {
        assert!(GroupDraft::from_body(&json!({"color": "red"})).is_err());
        assert!(GroupDraft::from_body(&json!({"name": "Ops", "members": [{"name": "x"}]})).is_err());
        assert!(GroupDraft::from_body(&json!({"name": "Ops", "members": "all"})).is_err());
    }

    #[test]
    fn numeric_accept_any_is_truthy_when_non_zero() {
        let flag = |value: serde_json::Value| {
            GroupDraft::from_body(&json!({"name": "Ops", "accept_any": value}))
                .unwrap()
                .accept_any
        };
        assert!(flag(json!(1)));
        assert!(flag(json!(2)));
        assert!(flag(json!(-1)));
        assert!(flag(json!(0.5)));
        assert!(!flag(json!(0)));
    }
}
