//! Declarative per-field rules for the sign-in and sign-up forms.
//!
//! The same schema drives the rendered form and the relay, so a request that
//! skips the browser is held to the same rules.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use std::{fmt, sync::LazyLock};
use utoipa::ToSchema;

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

static ISO_DATE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d{4}-(0[1-9]|1[0-2])-(0[1-9]|[12]\d|3[01])$").ok());

/// Which form is being rendered or submitted.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    SignIn,
    SignUp,
}

impl AuthMode {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::SignIn => "/sign-in",
            Self::SignUp => "/sign-up",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::SignIn => "Sign In",
            Self::SignUp => "Sign Up",
        }
    }

    /// The mode the footer link switches to.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::SignIn => Self::SignUp,
            Self::SignUp => Self::SignIn,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    FirstName,
    LastName,
    Address1,
    City,
    State,
    PostalCode,
    DateOfBirth,
    Ssn,
    Email,
    Password,
}

impl Field {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Address1 => "address1",
            Self::City => "city",
            Self::State => "state",
            Self::PostalCode => "postal_code",
            Self::DateOfBirth => "date_of_birth",
            Self::Ssn => "ssn",
            Self::Email => "email",
            Self::Password => "password",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::FirstName => "First Name",
            Self::LastName => "Last Name",
            Self::Address1 => "Address",
            Self::City => "City",
            Self::State => "State",
            Self::PostalCode => "Postal Code",
            Self::DateOfBirth => "Date of Birth",
            Self::Ssn => "SSN",
            Self::Email => "Email",
            Self::Password => "Password",
        }
    }

    #[must_use]
    pub fn placeholder(self) -> &'static str {
        match self {
            Self::Address1 => "Enter your specific address",
            Self::State => "ex: NY",
            Self::PostalCode => "ex: 11101",
            Self::DateOfBirth => "yyyy-mm-dd",
            Self::Ssn => "ex: 1234",
            Self::Email => "Enter your email",
            Self::Password => "Enter your password",
            Self::FirstName | Self::LastName | Self::City => "",
        }
    }

    /// Values of secret fields are never echoed back into a re-rendered form.
    #[must_use]
    pub fn is_secret(self) -> bool {
        matches!(self, Self::Password | Self::Ssn)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    Required,
    Email,
    MinLen(usize),
    MaxLen(usize),
    IsoDate,
}

impl Rule {
    fn check(self, value: &str) -> Result<(), String> {
        match self {
            Self::Required if value.trim().is_empty() => Err("This field is required".to_string()),
            Self::Email
                if !EMAIL_RE
                    .as_ref()
                    .is_some_and(|regex| regex.is_match(value)) =>
            {
                Err("Enter a valid email address".to_string())
            }
            Self::MinLen(min) if value.chars().count() < min => {
                Err(format!("Must be at least {min} characters"))
            }
            Self::MaxLen(max) if value.chars().count() > max => {
                Err(format!("Must be at most {max} characters"))
            }
            Self::IsoDate
                if !ISO_DATE_RE
                    .as_ref()
                    .is_some_and(|regex| regex.is_match(value)) =>
            {
                Err("Use the format yyyy-mm-dd".to_string())
            }
            Self::IsoDate if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_err() => {
                Err("Enter a valid date".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FieldRules {
    pub field: Field,
    pub rules: &'static [Rule],
}

const EMAIL_RULES: FieldRules = FieldRules {
    field: Field::Email,
    rules: &[Rule::Required, Rule::Email],
};

const PASSWORD_RULES: FieldRules = FieldRules {
    field: Field::Password,
    rules: &[Rule::Required, Rule::MinLen(8)],
};

const SIGN_IN_SCHEMA: &[FieldRules] = &[EMAIL_RULES, PASSWORD_RULES];

const SIGN_UP_SCHEMA: &[FieldRules] = &[
    FieldRules {
        field: Field::FirstName,
        rules: &[Rule::Required],
    },
    FieldRules {
        field: Field::LastName,
        rules: &[Rule::Required],
    },
    FieldRules {
        field: Field::Address1,
        rules: &[Rule::Required, Rule::MaxLen(50)],
    },
    FieldRules {
        field: Field::City,
        rules: &[Rule::Required, Rule::MaxLen(50)],
    },
    FieldRules {
        field: Field::State,
        rules: &[Rule::Required, Rule::MinLen(2), Rule::MaxLen(2)],
    },
    FieldRules {
        field: Field::PostalCode,
        rules: &[Rule::Required, Rule::MinLen(3), Rule::MaxLen(6)],
    },
    FieldRules {
        field: Field::DateOfBirth,
        rules: &[Rule::Required, Rule::IsoDate],
    },
    FieldRules {
        field: Field::Ssn,
        rules: &[Rule::Required, Rule::MinLen(3)],
    },
    EMAIL_RULES,
    PASSWORD_RULES,
];

/// Rules for the given mode, in render order.
#[must_use]
pub fn schema(mode: AuthMode) -> &'static [FieldRules] {
    match mode {
        AuthMode::SignIn => SIGN_IN_SCHEMA,
        AuthMode::SignUp => SIGN_UP_SCHEMA,
    }
}

/// Anything that can hand a raw field value to the validator.
pub trait FieldSource {
    fn value(&self, field: Field) -> &str;
}

/// First failing rule per field, keyed by field name, in schema order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<(&'static str, String)>);

impl ValidationErrors {
    /// A single failure for an input that is not part of a form schema.
    #[must_use]
    pub fn single(name: &'static str, message: &str) -> Self {
        Self(vec![(name, message.to_string())])
    }

    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.get_named(field.name())
    }

    #[must_use]
    pub fn get_named(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, message)| message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(key, message)| (*key, message.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.iter().map(|(key, _)| *key).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// Run the mode's schema over `values`.
///
/// # Errors
/// Returns every field whose first failing rule rejected the value.
pub fn validate(mode: AuthMode, values: &impl FieldSource) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    for field_rules in schema(mode) {
        let field = field_rules.field;
        // secrets are checked exactly as typed
        let value = if field.is_secret() {
            values.value(field)
        } else {
            values.value(field).trim()
        };
        if let Some(message) = field_rules
            .rules
            .iter()
            .find_map(|rule| rule.check(value).err())
        {
            errors.0.push((field.name(), message));
        }
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Values(HashMap<Field, &'static str>);

    impl FieldSource for Values {
        fn value(&self, field: Field) -> &str {
            self.0.get(&field).copied().unwrap_or("")
        }
    }

    fn sign_up_values() -> Values {
        Values(HashMap::from([
            (Field::FirstName, "Ada"),
            (Field::LastName, "Lovelace"),
            (Field::Address1, "12 Analytical Row"),
            (Field::City, "London"),
            (Field::State, "NY"),
            (Field::PostalCode, "11101"),
            (Field::DateOfBirth, "1815-12-10"),
            (Field::Ssn, "1234"),
            (Field::Email, "ada@example.com"),
            (Field::Password, "secret123"),
        ]))
    }

    #[test]
    fn sign_in_schema_only_checks_credentials() {
        let fields: Vec<Field> = schema(AuthMode::SignIn).iter().map(|r| r.field).collect();
        assert_eq!(fields, vec![Field::Email, Field::Password]);
    }

    #[test]
    fn sign_up_accepts_complete_profile() {
        assert_eq!(validate(AuthMode::SignUp, &sign_up_values()), Ok(()));
    }

    #[test]
    fn sign_in_ignores_profile_fields() {
        let values = Values(HashMap::from([
            (Field::Email, "a@b.com"),
            (Field::Password, "secret123"),
        ]));
        assert_eq!(validate(AuthMode::SignIn, &values), Ok(()));
        assert!(validate(AuthMode::SignUp, &values).is_err());
    }

    #[test]
    fn reports_first_failing_rule_per_field() {
        let values = Values(HashMap::from([(Field::Email, "not-an-email")]));
        let errors = validate(AuthMode::SignIn, &values).err().unwrap_or_default();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get(Field::Email), Some("Enter a valid email address"));
        assert_eq!(errors.get(Field::Password), Some("This field is required"));
    }

    #[test]
    fn length_rules_count_characters() {
        let mut values = sign_up_values();
        values.0.insert(Field::State, "NYC");
        values.0.insert(Field::Ssn, "12");
        let errors = validate(AuthMode::SignUp, &values).err().unwrap_or_default();
        assert_eq!(errors.get(Field::State), Some("Must be at most 2 characters"));
        assert_eq!(errors.get(Field::Ssn), Some("Must be at least 3 characters"));
    }

    #[test]
    fn single_letter_names_are_accepted() {
        let mut values = sign_up_values();
        values.0.insert(Field::FirstName, "A");
        values.0.insert(Field::LastName, "B");
        assert_eq!(validate(AuthMode::SignUp, &values), Ok(()));
    }

    #[test]
    fn passwords_are_not_trimmed() {
        let values = Values(HashMap::from([
            (Field::Email, " a@b.com "),
            (Field::Password, "abcdefg "),
        ]));
        assert_eq!(validate(AuthMode::SignIn, &values), Ok(()));

        let values = Values(HashMap::from([
            (Field::Email, "a@b.com"),
            (Field::Password, "        "),
        ]));
        let errors = validate(AuthMode::SignIn, &values).err().unwrap_or_default();
        assert_eq!(errors.get(Field::Password), Some("This field is required"));
    }

    #[test]
    fn date_of_birth_must_exist() {
        let mut values = sign_up_values();
        values.0.insert(Field::DateOfBirth, "1990-02-31");
        let errors = validate(AuthMode::SignUp, &values).err().unwrap_or_default();
        assert_eq!(errors.get(Field::DateOfBirth), Some("Enter a valid date"));

        values.0.insert(Field::DateOfBirth, "2000-02-29");
        assert_eq!(validate(AuthMode::SignUp, &values), Ok(()));
    }

    #[test]
    fn date_of_birth_requires_iso_format() {
        let mut values = sign_up_values();
        values.0.insert(Field::DateOfBirth, "10/12/1815");
        let errors = validate(AuthMode::SignUp, &values).err().unwrap_or_default();
        assert_eq!(
            errors.get(Field::DateOfBirth),
            Some("Use the format yyyy-mm-dd")
        );
    }

    #[test]
    fn whitespace_only_is_missing() {
        let values = Values(HashMap::from([
            (Field::Email, "   "),
            (Field::Password, "secret123"),
        ]));
        let errors = validate(AuthMode::SignIn, &values).err().unwrap_or_default();
        assert_eq!(errors.get(Field::Email), Some("This field is required"));
    }

    #[test]
    fn errors_serialize_in_schema_order() -> anyhow::Result<()> {
        let values = Values(HashMap::new());
        let errors = validate(AuthMode::SignUp, &values).err().unwrap_or_default();
        let names: Vec<&str> = errors.iter().map(|(name, _)| name).collect();
        assert_eq!(names.first(), Some(&"first_name"));
        assert_eq!(names.last(), Some(&"password"));
        let rendered = serde_json::to_string(&errors)?;
        let first = rendered.find("first_name").unwrap_or(usize::MAX);
        let email = rendered.find("email").unwrap_or(0);
        assert!(first < email);
        Ok(())
    }

    #[test]
    fn modes_link_to_each_other() {
        assert_eq!(AuthMode::SignIn.other().path(), "/sign-up");
        assert_eq!(AuthMode::SignUp.other().path(), "/sign-in");
    }
}
