use serde::Deserialize;

/// Fixed page size for offer listings.
pub const PAGE_SIZE: i64 = 10;

/// Raw query-string parameters. Everything is optional and kept as text;
/// values that do not parse fall back to the defaults instead of rejecting
/// the request.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub page: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "priceMin")]
    pub price_min: Option<String>,
    #[serde(rename = "priceMax")]
    pub price_max: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Price,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

/// Deterministic filter/sort/pagination plan resolved from loose parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPlan {
    pub title: String,
    pub price_min: f64,
    pub price_max: Option<f64>,
    pub sort_field: SortField,
    pub sort_dir: SortDir,
    pub page: i64,
}

fn parse_sort(raw: &str) -> Option<(SortField, SortDir)> {
    let (field, dir) = raw.split_once('-')?;
    let field = match field {
        "price" => SortField::Price,
        "name" => SortField::Name,
        _ => return None,
    };
    let dir = match dir {
        "asc" => SortDir::Asc,
        "desc" => SortDir::Desc,
        _ => return None,
    };
    Some((field, dir))
}

impl SearchPlan {
    /// Defaults: page 1, empty title filter, price range [0, +inf), sorted by
    /// price descending. Unparsable or unrecognized values fall back to the
    /// defaults.
    pub fn from_params(p: &SearchParams) -> Self {
        let (sort_field, sort_dir) = p
            .sort
            .as_deref()
            .and_then(parse_sort)
            .unwrap_or((SortField::Price, SortDir::Desc));
        let page = p
            .page
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(1)
            .max(1);
        let price_min = p
            .price_min
            .as_deref()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0);
        let price_max = p
            .price_max
            .as_deref()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite());
        Self {
            title: p.title.clone().unwrap_or_default(),
            price_min,
            price_max,
            sort_field,
            sort_dir,
            page,
        }
    }

    /// Saturates rather than overflowing so an absurd page number yields an
    /// empty page, not an error.
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(PAGE_SIZE)
    }

    /// ILIKE needle for a case-insensitive substring match on the title;
    /// `%`, `_` and the escape character are neutralized in the user input.
    pub fn title_pattern(&self) -> String {
        let escaped = self
            .title
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{}%", escaped)
    }

    /// Inclusive upper price bound as a bindable value.
    pub fn price_max_bound(&self) -> f64 {
        self.price_max.unwrap_or(f64::MAX)
    }

    /// ORDER BY clause; only these fixed strings ever reach the SQL text.
    pub fn order_by(&self) -> &'static str {
        match (self.sort_field, self.sort_dir) {
            (SortField::Price, SortDir::Asc) => "o.price ASC",
            (SortField::Price, SortDir::Desc) => "o.price DESC",
            (SortField::Name, SortDir::Asc) => "o.title ASC",
            (SortField::Name, SortDir::Desc) => "o.title DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_page_one_price_descending() {
        let plan = SearchPlan::from_params(&SearchParams::default());
        assert_eq!(plan.page, 1);
        assert_eq!(plan.title, "");
        assert_eq!(plan.price_min, 0.0);
        assert_eq!(plan.price_max, None);
        assert_eq!(plan.sort_field, SortField::Price);
        assert_eq!(plan.sort_dir, SortDir::Desc);
        assert_eq!(plan.offset(), 0);
        assert_eq!(plan.order_by(), "o.price DESC");
    }

    #[test]
    fn recognized_sort_keys_resolve_field_and_direction() {
        let cases = [
            ("price-asc", "o.price ASC"),
            ("price-desc", "o.price DESC"),
            ("name-asc", "o.title ASC"),
            ("name-desc", "o.title DESC"),
        ];
        for (key, clause) in cases {
            let plan = SearchPlan::from_params(&SearchParams {
                sort: Some(key.into()),
                ..Default::default()
            });
            assert_eq!(plan.order_by(), clause, "sort key {key}");
        }
    }

    #[test]
    fn unrecognized_sort_falls_back_to_default() {
        for key in ["created-asc", "price", "price-sideways", ""] {
            let plan = SearchPlan::from_params(&SearchParams {
                sort: Some(key.into()),
                ..Default::default()
            });
            assert_eq!(plan.order_by(), "o.price DESC", "sort key {key:?}");
        }
    }

    #[test]
    fn offset_is_pages_of_ten() {
        let plan = SearchPlan::from_params(&SearchParams {
            page: Some("3".into()),
            ..Default::default()
        });
        assert_eq!(plan.page, 3);
        assert_eq!(plan.offset(), 20);
    }

    #[test]
    fn page_below_one_is_clamped() {
        for page in ["0", "-5"] {
            let plan = SearchPlan::from_params(&SearchParams {
                page: Some(page.into()),
                ..Default::default()
            });
            assert_eq!(plan.page, 1);
            assert_eq!(plan.offset(), 0);
        }
    }

    #[test]
    fn huge_page_saturates_instead_of_overflowing() {
        let plan = SearchPlan::from_params(&SearchParams {
            page: Some(i64::MAX.to_string()),
            ..Default::default()
        });
        assert_eq!(plan.page, i64::MAX);
        assert_eq!(plan.offset(), i64::MAX);
    }

    #[test]
    fn unparsable_values_fall_back_to_defaults() {
        let plan = SearchPlan::from_params(&SearchParams {
            page: Some("abc".into()),
            price_min: Some("cheap".into()),
            price_max: Some("expensive".into()),
            ..Default::default()
        });
        assert_eq!(plan.page, 1);
        assert_eq!(plan.price_min, 0.0);
        assert_eq!(plan.price_max, None);
    }

    #[test]
    fn non_finite_price_bounds_are_ignored() {
        let plan = SearchPlan::from_params(&SearchParams {
            price_min: Some("NaN".into()),
            price_max: Some("inf".into()),
            ..Default::default()
        });
        assert_eq!(plan.price_min, 0.0);
        assert_eq!(plan.price_max, None);
    }

    #[test]
    fn price_range_is_carried_inclusively() {
        let plan = SearchPlan::from_params(&SearchParams {
            price_min: Some("20".into()),
            price_max: Some("50".into()),
            ..Default::default()
        });
        assert_eq!(plan.price_min, 20.0);
        assert_eq!(plan.price_max_bound(), 50.0);
    }

    #[test]
    fn missing_price_max_means_unbounded() {
        let plan = SearchPlan::from_params(&SearchParams::default());
        assert_eq!(plan.price_max_bound(), f64::MAX);
    }

    #[test]
    fn title_pattern_is_a_substring_needle() {
        let plan = SearchPlan::from_params(&SearchParams {
            title: Some("shirt".into()),
            ..Default::default()
        });
        assert_eq!(plan.title_pattern(), "%shirt%");
    }

    #[test]
    fn title_pattern_escapes_like_metacharacters() {
        let plan = SearchPlan::from_params(&SearchParams {
            title: Some("100%_wool\\blend".into()),
            ..Default::default()
        });
        assert_eq!(plan.title_pattern(), "%100\\%\\_wool\\\\blend%");
    }

    #[test]
    fn empty_title_matches_everything() {
        let plan = SearchPlan::from_params(&SearchParams::default());
        assert_eq!(plan.title_pattern(), "%%");
    }
}
