//! List configuration types.
//!
//! `ListConfig` is the validated, typed description of one combined list. Two
//! configurations that compare equal (after [`ListConfig::normalized`]) describe
//! the same list and resolve to the same identifier.
//!
//! `RawListConfig` mirrors the public request form, where every field arrives as
//! an optional string. It is converted into a `ListConfig` exactly once, at the
//! boundary, with `TryFrom`.

use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::config::constants::{DAILY_PROVIDERS, DAILY_WINDOW_DAYS, DATE_FORMAT_WITH_HYPHEN};
use crate::error_handling::ConfigError;

/// Longest date window a single list may cover.
const MAX_WINDOW_DAYS: i64 = 3660;

/// Positional voting method used to combine source lists.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(try_from = "String", into = "String")]
pub enum CombinationMethod {
    /// Borda count: `max_rank + 1 - rescaled_rank` per source.
    Borda,
    /// Dowdall count: `1 / rescaled_rank` per source.
    Dowdall,
}

impl TryFrom<String> for CombinationMethod {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match CombinationMethod::from_str(&value) {
            Ok(method) => Ok(method),
            Err(_) => Err(ConfigError::UnsupportedMethod(value)),
        }
    }
}

impl From<CombinationMethod> for String {
    fn from(method: CombinationMethod) -> Self {
        method.to_string()
    }
}

/// How many leading rows of every source list take part in the combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum ListPrefix {
    /// Read every source list to the end.
    #[default]
    Full,
    /// Read only the first `n` rows of every source list.
    Top(usize),
}

impl ListPrefix {
    /// Row limit applied to each source, `None` meaning unbounded.
    pub fn limit(self) -> Option<usize> {
        match self {
            ListPrefix::Full => None,
            ListPrefix::Top(n) => Some(n),
        }
    }

    /// Normalizes the request form's prefix selector.
    ///
    /// `"full"` (or nothing) is unbounded, `"custom"` takes the separately supplied
    /// custom value, anything else must be the literal row count.
    pub fn parse(prefix: Option<&str>, custom_value: Option<&str>) -> Result<Self, ConfigError> {
        let value = match prefix.map(str::trim) {
            None | Some("") | Some("full") => return Ok(ListPrefix::Full),
            Some("custom") => custom_value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingField("listPrefixCustomValue"))?,
            Some(literal) => literal,
        };
        match parse_number::<usize>("listPrefix", value)? {
            0 => Err(ConfigError::InvalidValue {
                field: "listPrefix",
                value: value.to_string(),
            }),
            n => Ok(ListPrefix::Top(n)),
        }
    }
}

/// Rank assigned to rows that survive the per-row filters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RankMode {
    /// Keep the rank printed in the source file; gaps appear where rows were dropped.
    /// The rescaling input size is the number of rows read before filtering.
    #[default]
    Retain,
    /// Renumber surviving rows `1, 2, 3, ...`.
    /// The rescaling input size is the number of rows that survived.
    Dense,
}

/// Typed configuration of one combined list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListConfig {
    /// First day of the window (inclusive)
    pub start_date: NaiveDate,
    /// Last day of the window (inclusive)
    pub end_date: NaiveDate,
    /// Providers whose daily lists are combined, in request order
    pub providers: Vec<String>,
    /// Voting method
    pub combination_method: CombinationMethod,
    /// Rows read from each source list
    #[serde(default)]
    pub list_prefix: ListPrefix,
    /// Keep only rows that are themselves registrable domains
    #[serde(default, rename = "filterPLD")]
    pub filter_pld: bool,
    /// Allowed top-level labels
    #[serde(default, rename = "filterTLDs", skip_serializing_if = "Option::is_none")]
    pub filter_tlds: Option<Vec<String>>,
    /// Keep only the first row seen per second-level label
    #[serde(default)]
    pub filter_organization: bool,
    /// Allowed subdomain labels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_subdomains: Option<Vec<String>>,
    /// Minimum number of distinct days a domain must appear on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusion_days: Option<usize>,
    /// Minimum number of distinct providers a domain must appear on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusion_lists: Option<usize>,
    /// Rank numbering after per-row filtering
    #[serde(default)]
    pub rank_mode: RankMode,
    /// Whether this is the canonical daily list
    #[serde(default)]
    pub is_daily_list: bool,
}

impl ListConfig {
    /// Canonical form used for identity comparisons.
    ///
    /// Empty allow-lists and zero presence thresholds select nothing, so they are
    /// folded into "filter off".
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();
        config.filter_tlds = non_empty(config.filter_tlds);
        config.filter_subdomains = non_empty(config.filter_subdomains);
        config.inclusion_days = config.inclusion_days.filter(|n| *n > 0);
        config.inclusion_lists = config.inclusion_lists.filter(|n| *n > 0);
        config
    }

    /// Checks the invariants the generator relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }
        for (index, provider) in self.providers.iter().enumerate() {
            if provider.is_empty() || provider.contains('/') || provider.contains("..") {
                return Err(ConfigError::InvalidValue {
                    field: "providers",
                    value: provider.clone(),
                });
            }
            if self.providers[..index].contains(provider) {
                return Err(ConfigError::DuplicateProvider(provider.clone()));
            }
        }
        if self.start_date > self.end_date {
            return Err(ConfigError::InvertedRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if let ListPrefix::Top(0) = self.list_prefix {
            return Err(ConfigError::InvalidValue {
                field: "listPrefix",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    /// Whether any per-row filter is active, which requires the parts variant of
    /// the source lists.
    pub fn requires_parts(&self) -> bool {
        self.filter_pld
            || self.filter_organization
            || self.filter_tlds.as_ref().is_some_and(|v| !v.is_empty())
            || self.filter_subdomains.as_ref().is_some_and(|v| !v.is_empty())
    }

    /// Every day of the window, in ascending order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.start_date
            .iter_days()
            .take_while(|day| *day <= self.end_date)
            .collect()
    }

    /// Row limit applied to each source list.
    pub fn input_prefix(&self) -> Option<usize> {
        self.list_prefix.limit()
    }

    /// Canonical JSON, the identity key of the configuration.
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.normalized())
    }
}

/// Default configuration of the canonical daily list ending on `day`.
pub fn daily_config(day: NaiveDate) -> ListConfig {
    ListConfig {
        start_date: day - Duration::days(DAILY_WINDOW_DAYS - 1),
        end_date: day,
        providers: DAILY_PROVIDERS.iter().map(|p| p.to_string()).collect(),
        combination_method: CombinationMethod::Dowdall,
        list_prefix: ListPrefix::Full,
        filter_pld: true,
        filter_tlds: None,
        filter_organization: false,
        filter_subdomains: None,
        inclusion_days: None,
        inclusion_lists: None,
        rank_mode: RankMode::Retain,
        is_daily_list: true,
    }
}

/// Resolves `today`, `yesterday` or a `YYYY-MM-DD` literal relative to `today`.
pub fn resolve_day(value: &str, today: NaiveDate) -> Result<NaiveDate, ConfigError> {
    match value.trim() {
        "today" => Ok(today),
        "yesterday" => Ok(today - Duration::days(1)),
        literal => parse_date(literal),
    }
}

/// Resolves a date window from the request form.
///
/// A start date plus `nb_days` spans forward, an end date plus `nb_days` spans
/// backward; the start date wins when both are given. Without `nb_days` both
/// bounds are required.
pub fn date_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    nb_days: Option<i64>,
) -> Result<(NaiveDate, NaiveDate), ConfigError> {
    if let Some(n) = nb_days {
        if !(1..=MAX_WINDOW_DAYS).contains(&n) {
            return Err(ConfigError::InvalidValue {
                field: "nbDays",
                value: n.to_string(),
            });
        }
    }
    match (start, end, nb_days) {
        (Some(start), _, Some(n)) => Ok((start, start + Duration::days(n - 1))),
        (None, Some(end), Some(n)) => Ok((end - Duration::days(n - 1), end)),
        (Some(start), Some(end), None) => Ok((start, end)),
        (None, None, _) => Err(ConfigError::MissingField("startDate")),
        _ => Err(ConfigError::MissingField("nbDays")),
    }
}

/// Untyped list request, as submitted by the web form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawListConfig {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub nb_days: Option<String>,
    pub providers: Vec<String>,
    pub combination_method: Option<String>,
    pub list_prefix: Option<String>,
    pub list_prefix_custom_value: Option<String>,
    #[serde(rename = "filterPLD")]
    pub filter_pld: Option<String>,
    #[serde(rename = "filterTLD")]
    pub filter_tld: Option<String>,
    #[serde(rename = "filterTLDValue")]
    pub filter_tld_value: Option<String>,
    pub filter_organization: Option<String>,
    pub filter_subdomain: Option<String>,
    pub filter_subdomain_value: Option<String>,
    pub inclusion_days: Option<String>,
    pub inclusion_days_value: Option<String>,
    pub inclusion_lists: Option<String>,
    pub inclusion_lists_value: Option<String>,
    pub rank_mode: Option<String>,
    pub is_daily_list: bool,
}

impl TryFrom<RawListConfig> for ListConfig {
    type Error = ConfigError;

    fn try_from(raw: RawListConfig) -> Result<Self, Self::Error> {
        let start = present(&raw.start_date).map(parse_date).transpose()?;
        let end = present(&raw.end_date).map(parse_date).transpose()?;
        let nb_days = present(&raw.nb_days)
            .map(|v| parse_number::<i64>("nbDays", v))
            .transpose()?;
        let (start_date, end_date) = date_window(start, end, nb_days)?;

        let combination_method = raw
            .combination_method
            .ok_or(ConfigError::MissingField("combinationMethod"))?
            .try_into()?;

        let list_prefix = ListPrefix::parse(
            raw.list_prefix.as_deref(),
            raw.list_prefix_custom_value.as_deref(),
        )?;

        let filter_tlds = if toggled(&raw.filter_tld) {
            split_values(raw.filter_tld_value.as_deref())
        } else {
            None
        };
        let filter_subdomains = if toggled(&raw.filter_subdomain) {
            split_values(raw.filter_subdomain_value.as_deref())
        } else {
            None
        };

        let inclusion_days = threshold(
            &raw.inclusion_days,
            &raw.inclusion_days_value,
            "inclusionDaysValue",
        )?;
        let inclusion_lists = threshold(
            &raw.inclusion_lists,
            &raw.inclusion_lists_value,
            "inclusionListsValue",
        )?;

        let rank_mode = match present(&raw.rank_mode) {
            None => RankMode::default(),
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                field: "rankMode",
                value: value.to_string(),
            })?,
        };

        let config = ListConfig {
            start_date,
            end_date,
            providers: raw
                .providers
                .into_iter()
                .map(|p| p.trim().to_string())
                .collect(),
            combination_method,
            list_prefix,
            filter_pld: toggled(&raw.filter_pld),
            filter_tlds,
            filter_organization: toggled(&raw.filter_organization),
            filter_subdomains,
            inclusion_days,
            inclusion_lists,
            rank_mode,
            is_daily_list: raw.is_daily_list,
        }
        .normalized();
        config.validate()?;
        Ok(config)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Checkbox semantics of the request form: any value but `false`/`off` is on.
fn toggled(value: &Option<String>) -> bool {
    match present(value) {
        Some(v) => !v.eq_ignore_ascii_case("false") && !v.eq_ignore_ascii_case("off"),
        None => false,
    }
}

fn split_values(value: Option<&str>) -> Option<Vec<String>> {
    let value = value?;
    if value.trim().is_empty() {
        return None;
    }
    Some(value.split(',').map(|v| v.trim().to_string()).collect())
}

fn threshold(
    toggle: &Option<String>,
    value: &Option<String>,
    field: &'static str,
) -> Result<Option<usize>, ConfigError> {
    if !toggled(toggle) {
        return Ok(None);
    }
    let value = present(value).ok_or(ConfigError::MissingField(field))?;
    parse_number(field, value).map(Some)
}

fn non_empty(values: Option<Vec<String>>) -> Option<Vec<String>> {
    values.filter(|v| !v.is_empty())
}

fn parse_date(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT_WITH_HYPHEN)
        .map_err(|_| ConfigError::InvalidDate(value.to_string()))
}

fn parse_number<T: FromStr>(field: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            field,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, DATE_FORMAT_WITH_HYPHEN).expect("valid test date")
    }

    fn raw_form() -> RawListConfig {
        RawListConfig {
            start_date: Some("2024-01-01".to_string()),
            nb_days: Some("3".to_string()),
            providers: vec!["alexa".to_string(), "umbrella".to_string()],
            combination_method: Some("borda".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_combination_method_round_trip() {
        for method in CombinationMethod::iter() {
            let text: String = method.into();
            assert_eq!(CombinationMethod::try_from(text).unwrap(), method);
        }
    }

    #[test]
    fn test_unknown_combination_method() {
        let err = CombinationMethod::try_from("condorcet".to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedMethod(ref m) if m == "condorcet"));
    }

    #[test]
    fn test_unknown_method_rejected_when_deserializing() {
        let json = r#"{"startDate":"2024-01-01","endDate":"2024-01-02","providers":["a"],"combinationMethod":"plurality"}"#;
        let err = serde_json::from_str::<ListConfig>(json).unwrap_err();
        assert!(err.to_string().contains("plurality"));
    }

    #[test]
    fn test_list_prefix_parse() {
        assert_eq!(ListPrefix::parse(None, None).unwrap(), ListPrefix::Full);
        assert_eq!(ListPrefix::parse(Some("full"), None).unwrap(), ListPrefix::Full);
        assert_eq!(
            ListPrefix::parse(Some("custom"), Some("2500")).unwrap(),
            ListPrefix::Top(2500)
        );
        assert_eq!(
            ListPrefix::parse(Some("10000"), None).unwrap(),
            ListPrefix::Top(10000)
        );
        assert!(ListPrefix::parse(Some("custom"), None).is_err());
        assert!(ListPrefix::parse(Some("lots"), None).is_err());
        assert!(ListPrefix::parse(Some("0"), None).is_err());
    }

    #[test]
    fn test_date_window_forward_and_backward() {
        assert_eq!(
            date_window(Some(day("2024-01-01")), None, Some(30)).unwrap(),
            (day("2024-01-01"), day("2024-01-30"))
        );
        assert_eq!(
            date_window(None, Some(day("2024-01-30")), Some(30)).unwrap(),
            (day("2024-01-01"), day("2024-01-30"))
        );
        // Start date wins over end date
        assert_eq!(
            date_window(Some(day("2024-02-01")), Some(day("2024-01-01")), Some(1)).unwrap(),
            (day("2024-02-01"), day("2024-02-01"))
        );
        assert!(date_window(None, None, Some(3)).is_err());
        assert!(date_window(Some(day("2024-01-01")), None, Some(0)).is_err());
    }

    #[test]
    fn test_raw_form_conversion() {
        let mut raw = raw_form();
        raw.filter_pld = Some("on".to_string());
        raw.filter_tld = Some("true".to_string());
        raw.filter_tld_value = Some("com, org".to_string());
        raw.inclusion_days = Some("on".to_string());
        raw.inclusion_days_value = Some("2".to_string());
        raw.list_prefix = Some("custom".to_string());
        raw.list_prefix_custom_value = Some("1000".to_string());

        let config = ListConfig::try_from(raw).unwrap();
        assert_eq!(config.start_date, day("2024-01-01"));
        assert_eq!(config.end_date, day("2024-01-03"));
        assert_eq!(config.combination_method, CombinationMethod::Borda);
        assert_eq!(config.list_prefix, ListPrefix::Top(1000));
        assert!(config.filter_pld);
        assert_eq!(
            config.filter_tlds,
            Some(vec!["com".to_string(), "org".to_string()])
        );
        assert_eq!(config.inclusion_days, Some(2));
        assert_eq!(config.inclusion_lists, None);
        assert!(config.requires_parts());
    }

    #[test]
    fn test_raw_form_toggle_off_ignores_value() {
        let mut raw = raw_form();
        raw.filter_tld = Some("false".to_string());
        raw.filter_tld_value = Some("com".to_string());
        let config = ListConfig::try_from(raw).unwrap();
        assert_eq!(config.filter_tlds, None);
        assert!(!config.requires_parts());
    }

    #[test]
    fn test_raw_form_unsupported_method() {
        let mut raw = raw_form();
        raw.combination_method = Some("approval".to_string());
        assert!(matches!(
            ListConfig::try_from(raw),
            Err(ConfigError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn test_raw_form_requires_providers() {
        let mut raw = raw_form();
        raw.providers.clear();
        assert!(matches!(
            ListConfig::try_from(raw),
            Err(ConfigError::NoProviders)
        ));
    }

    #[test]
    fn test_raw_form_rejects_duplicate_provider() {
        let mut raw = raw_form();
        raw.providers = vec![
            "alexa".to_string(),
            "umbrella".to_string(),
            " alexa".to_string(),
        ];
        assert!(matches!(
            ListConfig::try_from(raw),
            Err(ConfigError::DuplicateProvider(p)) if p == "alexa"
        ));
    }

    #[test]
    fn test_raw_form_rejects_path_like_provider() {
        let mut raw = raw_form();
        raw.providers = vec!["../etc".to_string()];
        assert!(ListConfig::try_from(raw).is_err());
    }

    #[test]
    fn test_dates_inclusive() {
        let config = daily_config(day("2024-03-30"));
        let dates = config.dates();
        assert_eq!(dates.len(), 30);
        assert_eq!(dates[0], day("2024-03-01"));
        assert_eq!(dates[29], day("2024-03-30"));
    }

    #[test]
    fn test_normalized_equal_configs_share_canonical_json() {
        let a = daily_config(day("2024-03-30"));
        let mut b = a.clone();
        b.filter_tlds = Some(Vec::new());
        b.inclusion_days = Some(0);
        assert_eq!(a.canonical_json().unwrap(), b.canonical_json().unwrap());
    }

    #[test]
    fn test_resolve_day() {
        let today = day("2024-05-10");
        assert_eq!(resolve_day("today", today).unwrap(), today);
        assert_eq!(resolve_day("yesterday", today).unwrap(), day("2024-05-09"));
        assert_eq!(resolve_day("2024-01-02", today).unwrap(), day("2024-01-02"));
        assert!(resolve_day("someday", today).is_err());
    }
}
