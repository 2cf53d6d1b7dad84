//! Tool catalog
//!
//! Declarative mapping from assistant-facing tool names to upstream
//! endpoints. Each entry names its host, path template, whether it needs a
//! pooled token, and how each argument is validated and placed.

use crate::services::upstream::{AuthMode, Host, UpstreamRequest};
use serde::Serialize;
use serde_json::{Map, Value};

// ============================================================================
// Definitions
// ============================================================================

/// How an argument value is validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamKind {
    /// Non-empty string
    Text,
    /// Integer within inclusive bounds
    Integer { min: i64, max: i64 },
    /// 0 or 1
    Flag,
    /// One of a fixed set of strings
    Choice { options: &'static [&'static str] },
}

/// Where a validated argument ends up in the upstream request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "to", content = "key", rename_all = "snake_case")]
pub enum Placement {
    /// Substituted into `{name}` in the path
    Path,
    /// Sent as a query parameter under the given key
    Query(&'static str),
    /// Annual flag sent as `type=Q4` (1) or `type=all` (0)
    ReportType,
    /// Count sent negated, i.e. "the last N rows"
    Backward(&'static str),
}

/// One tool argument
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParamDef {
    pub name: &'static str,
    pub kind: ParamKind,
    #[serde(skip)]
    pub placement: Placement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
    pub description: &'static str,
}

/// One tool and the endpoint it calls
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EndpointDef {
    pub name: &'static str,
    pub description: &'static str,
    pub host: Host,
    #[serde(skip)]
    pub path: &'static str,
    pub auth: AuthMode,
    #[serde(skip)]
    pub fixed_query: &'static [(&'static str, &'static str)],
    pub params: &'static [ParamDef],
    /// Query key that receives the current time in epoch milliseconds
    #[serde(skip)]
    pub now_millis_key: Option<&'static str>,
}

const PERIODS: &[&str] = &[
    "day", "week", "month", "quarter", "year", "120m", "60m", "30m", "15m", "5m", "1m",
];

const STOCK_CODE: ParamDef = ParamDef {
    name: "stock_code",
    kind: ParamKind::Text,
    placement: Placement::Query("symbol"),
    default: Some("SZ000002"),
    description: "Symbol, e.g. SZ000002, SH600000, HK00700, AAPL",
};

const IS_ANNALS: ParamDef = ParamDef {
    name: "is_annals",
    kind: ParamKind::Flag,
    placement: Placement::ReportType,
    default: Some("1"),
    description: "1 for annual reports only, 0 for every reporting period",
};

const REPORT_COUNT: ParamDef = ParamDef {
    name: "count",
    kind: ParamKind::Integer { min: 1, max: 100 },
    placement: Placement::Query("count"),
    default: Some("5"),
    description: "Number of reporting periods",
};

const INDEX_CODE: ParamDef = ParamDef {
    name: "index_code",
    kind: ParamKind::Text,
    placement: Placement::Query("symbol"),
    default: Some("SH000300"),
    description: "Index symbol, e.g. SH000300",
};

const INDEX_CODE_PATH: ParamDef = ParamDef {
    placement: Placement::Path,
    ..INDEX_CODE
};

const FUND_CODE: ParamDef = ParamDef {
    name: "fund_code",
    kind: ParamKind::Text,
    placement: Placement::Path,
    default: None,
    description: "Fund code, e.g. 110011",
};

const CUBE_SYMBOL: ParamDef = ParamDef {
    name: "cube_symbol",
    kind: ParamKind::Text,
    placement: Placement::Query("cube_symbol"),
    default: None,
    description: "Portfolio (cube) symbol, e.g. ZH000001",
};

const PAGE: ParamDef = ParamDef {
    name: "page",
    kind: ParamKind::Integer { min: 1, max: 1000 },
    placement: Placement::Query("page"),
    default: Some("1"),
    description: "Page number",
};

const PAGE_SIZE: ParamDef = ParamDef {
    name: "size",
    kind: ParamKind::Integer { min: 1, max: 200 },
    placement: Placement::Query("size"),
    default: Some("10"),
    description: "Page size",
};

const fn stock(
    name: &'static str,
    description: &'static str,
    path: &'static str,
) -> EndpointDef {
    EndpointDef {
        name,
        description,
        host: Host::Stock,
        path,
        auth: AuthMode::Token,
        fixed_query: &[],
        params: &[STOCK_CODE],
        now_millis_key: None,
    }
}

const fn finance(
    name: &'static str,
    description: &'static str,
    path: &'static str,
) -> EndpointDef {
    EndpointDef {
        fixed_query: &[("is_detail", "true")],
        params: &[STOCK_CODE, IS_ANNALS, REPORT_COUNT],
        ..stock(name, description, path)
    }
}

const fn danjuan(
    name: &'static str,
    description: &'static str,
    path: &'static str,
    params: &'static [ParamDef],
) -> EndpointDef {
    EndpointDef {
        name,
        description,
        host: Host::Danjuan,
        path,
        auth: AuthMode::Anonymous,
        fixed_query: &[],
        params,
        now_millis_key: None,
    }
}

/// Every tool the gateway exposes
pub static CATALOG: &[EndpointDef] = &[
    // Quotes
    EndpointDef {
        auth: AuthMode::Anonymous,
        ..stock("quotec", "Real-time quote", "/v5/stock/realtime/quotec.json")
    },
    EndpointDef {
        fixed_query: &[("extend", "detail")],
        ..stock("quote_detail", "Detailed real-time quote", "/v5/stock/quote.json")
    },
    stock("pankou", "Order book snapshot", "/v5/stock/realtime/pankou.json"),
    EndpointDef {
        fixed_query: &[("type", "before"), ("indicator", "kline")],
        params: &[
            STOCK_CODE,
            ParamDef {
                name: "period",
                kind: ParamKind::Choice { options: PERIODS },
                placement: Placement::Query("period"),
                default: Some("day"),
                description: "Bar period",
            },
            ParamDef {
                name: "count",
                kind: ParamKind::Integer { min: 1, max: 1000 },
                placement: Placement::Backward("count"),
                default: Some("284"),
                description: "Number of bars ending now",
            },
        ],
        now_millis_key: Some("begin"),
        ..stock("kline", "K-line bars", "/v5/stock/chart/kline.json")
    },
    // Research
    stock("earningforecast", "Annual earnings forecasts", "/stock/forecast/earningforecast.json"),
    stock("report", "Institutional ratings", "/stock/report/latest.json"),
    // Capital
    stock("capital_flow", "Intraday capital flow by minute", "/v5/stock/capital/flow.json"),
    EndpointDef {
        fixed_query: &[("count", "20")],
        ..stock("capital_history", "Daily capital flow history", "/v5/stock/capital/history.json")
    },
    stock("capital_assort", "Capital flow by order size", "/v5/stock/capital/assort.json"),
    stock("blocktrans", "Block trades", "/v5/stock/capital/blocktrans.json"),
    stock("margin", "Margin trading balances", "/v5/stock/capital/margin.json"),
    // Financial statements
    finance("indicator", "Key financial indicators", "/v5/stock/finance/cn/indicator.json"),
    finance("income", "Income statement", "/v5/stock/finance/cn/income.json"),
    finance("balance", "Balance sheet", "/v5/stock/finance/cn/balance.json"),
    finance("cash_flow", "Cash flow statement", "/v5/stock/finance/cn/cash_flow.json"),
    EndpointDef {
        params: &[STOCK_CODE, REPORT_COUNT],
        ..finance("business", "Revenue breakdown by business", "/v5/stock/finance/cn/business.json")
    },
    // F10
    EndpointDef {
        params: &[
            STOCK_CODE,
            ParamDef {
                name: "circula",
                kind: ParamKind::Flag,
                placement: Placement::Query("circula"),
                default: Some("1"),
                description: "1 for top float holders, 0 for top holders",
            },
        ],
        ..stock("top_holders", "Top ten holders", "/v5/stock/f10/cn/top_holders.json")
    },
    stock("main_indicator", "Main indicators", "/v5/stock/f10/cn/indicator.json"),
    stock("holders", "Shareholder count history", "/v5/stock/f10/cn/holders.json"),
    stock(
        "org_holding_change",
        "Institutional holding changes",
        "/v5/stock/f10/cn/org_holding/change.json",
    ),
    EndpointDef {
        params: &[STOCK_CODE, PAGE, PAGE_SIZE],
        ..stock("bonus", "Dividends and splits", "/v5/stock/f10/cn/bonus.json")
    },
    EndpointDef {
        fixed_query: &[("type", "single")],
        ..stock("industry_compare", "Industry comparison", "/v5/stock/f10/cn/industry/compare.json")
    },
    // Watch lists
    EndpointDef {
        fixed_query: &[("system", "true")],
        params: &[],
        ..stock("watch_list", "Watch list groups of the token owner", "/v5/stock/portfolio/list.json")
    },
    EndpointDef {
        fixed_query: &[("size", "1000"), ("category", "1")],
        params: &[ParamDef {
            name: "pid",
            kind: ParamKind::Integer { min: i64::MIN, max: i64::MAX },
            placement: Placement::Query("pid"),
            default: None,
            description: "Watch list group id from watch_list",
        }],
        ..stock("watch_stock", "Stocks in a watch list group", "/v5/stock/portfolio/stock/list.json")
    },
    // Search
    EndpointDef {
        host: Host::Xueqiu,
        params: &[ParamDef {
            name: "keyword",
            kind: ParamKind::Text,
            placement: Placement::Query("q"),
            default: Some("SZ000002"),
            description: "Name, pinyin or code fragment",
        }],
        ..stock("suggest_stock", "Search stocks by keyword", "/query/v1/suggest_stock.json")
    },
    // Cubes
    EndpointDef {
        host: Host::Xueqiu,
        params: &[CUBE_SYMBOL],
        ..stock("nav_daily", "Portfolio daily net value", "/cubes/nav_daily/all.json")
    },
    EndpointDef {
        host: Host::Xueqiu,
        fixed_query: &[("count", "20"), ("page", "1")],
        params: &[CUBE_SYMBOL],
        ..stock("rebalancing_history", "Portfolio rebalancing history", "/cubes/rebalancing/history.json")
    },
    // Indices
    danjuan("index_basic_info", "Index basics", "/djapi/fundx/base/index/detail", &[INDEX_CODE]),
    danjuan(
        "index_details_data",
        "Index valuation details",
        "/djapi/index_eva/detail/{index_code}",
        &[INDEX_CODE_PATH],
    ),
    danjuan(
        "index_weight_top10",
        "Top ten index constituents",
        "/djapi/fundx/base/index/weight/top10",
        &[INDEX_CODE],
    ),
    EndpointDef {
        fixed_query: &[("day", "7")],
        ..danjuan("index_perf_7", "Index performance, 7 days", "/djapi/fundx/base/index/perf", &[INDEX_CODE])
    },
    EndpointDef {
        fixed_query: &[("day", "30")],
        ..danjuan("index_perf_30", "Index performance, 30 days", "/djapi/fundx/base/index/perf", &[INDEX_CODE])
    },
    EndpointDef {
        fixed_query: &[("day", "90")],
        ..danjuan("index_perf_90", "Index performance, 90 days", "/djapi/fundx/base/index/perf", &[INDEX_CODE])
    },
    // Funds
    danjuan("fund_detail", "Fund details", "/djapi/fund/detail/{fund_code}", &[FUND_CODE]),
    danjuan("fund_info", "Fund basic info", "/djapi/fund/{fund_code}", &[FUND_CODE]),
    EndpointDef {
        fixed_query: &[("day", "ty")],
        ..danjuan("fund_growth", "Fund growth this year", "/djapi/fund/growth/{fund_code}", &[FUND_CODE])
    },
    danjuan(
        "fund_nav_history",
        "Fund net value history",
        "/djapi/fund/nav/history/{fund_code}",
        &[FUND_CODE, PAGE, PAGE_SIZE],
    ),
    danjuan(
        "fund_achievement",
        "Fund performance",
        "/djapi/fundx/base/fund/achievement/{fund_code}",
        &[FUND_CODE],
    ),
    danjuan(
        "fund_asset",
        "Fund asset allocation",
        "/djapi/fundx/base/fund/record/asset/percent",
        &[ParamDef {
            placement: Placement::Query("fund_code"),
            ..FUND_CODE
        }],
    ),
    EndpointDef {
        fixed_query: &[("post_status", "1")],
        ..danjuan(
            "fund_manager",
            "Fund managers",
            "/djapi/fundx/base/fund/manager/list",
            &[ParamDef {
                placement: Placement::Query("fund_code"),
                ..FUND_CODE
            }],
        )
    },
    danjuan(
        "fund_trade_date",
        "Fund trading calendar",
        "/djapi/fund/order/v2/trade_date",
        &[ParamDef {
            placement: Placement::Query("fd_code"),
            ..FUND_CODE
        }],
    ),
    danjuan("fund_derived", "Fund derived metrics", "/djapi/fund/derived/{fund_code}", &[FUND_CODE]),
    // Bonds
    EndpointDef {
        name: "convertible_bond",
        description: "Convertible bond listings, newest first",
        host: Host::Eastmoney,
        path: "/api/data/v1/get",
        auth: AuthMode::Anonymous,
        fixed_query: &[
            ("reportName", "RPT_BOND_CB_LIST"),
            ("columns", "ALL"),
            ("sortColumns", "PUBLIC_START_DATE"),
            ("sortTypes", "-1"),
            ("source", "WEB"),
            ("client", "WEB"),
        ],
        params: &[
            ParamDef {
                name: "page_size",
                kind: ParamKind::Integer { min: 1, max: 500 },
                placement: Placement::Query("pageSize"),
                default: Some("5"),
                description: "Rows per page",
            },
            ParamDef {
                name: "page_count",
                kind: ParamKind::Integer { min: 1, max: 1000 },
                placement: Placement::Query("pageNumber"),
                default: Some("1"),
                description: "Page number",
            },
        ],
        now_millis_key: None,
    },
];

// ============================================================================
// Lookup & Request Building
// ============================================================================

/// Find a tool by name
pub fn find(name: &str) -> Option<&'static EndpointDef> {
    CATALOG.iter().find(|def| def.name == name)
}

/// Validation failure for tool arguments
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ParamError(pub String);

impl EndpointDef {
    /// Validate `args` and shape the upstream request
    pub fn build_request(&self, args: &Map<String, Value>) -> Result<UpstreamRequest, ParamError> {
        if let Some(unknown) = args
            .keys()
            .find(|key| !self.params.iter().any(|p| p.name == key.as_str()))
        {
            return Err(ParamError(format!(
                "unknown parameter `{}` for tool `{}`",
                unknown, self.name
            )));
        }

        let mut path = self.path.to_string();
        let mut request = UpstreamRequest::new(self.host, String::new(), self.auth);

        for param in self.params {
            let value = param.resolve(args.get(param.name))?;
            match param.placement {
                Placement::Path => {
                    if !is_path_safe(&value) {
                        return Err(ParamError(format!(
                            "parameter `{}` must be a code of letters and digits, optionally with '.', '-' or '_'",
                            param.name
                        )));
                    }
                    path = path.replace(&format!("{{{}}}", param.name), &value);
                }
                Placement::Query(key) => request.query.push((key.to_string(), value)),
                Placement::ReportType => {
                    let kind = if value == "1" { "Q4" } else { "all" };
                    request.query.push(("type".to_string(), kind.to_string()));
                }
                Placement::Backward(key) => {
                    request.query.push((key.to_string(), format!("-{}", value)));
                }
            }
        }

        for (key, value) in self.fixed_query {
            request.query.push((key.to_string(), value.to_string()));
        }
        if let Some(key) = self.now_millis_key {
            request.query.push((key.to_string(), now_millis().to_string()));
        }

        request.path = path;
        Ok(request)
    }
}

impl ParamDef {
    /// Validate a supplied value or fall back to the default
    fn resolve(&self, supplied: Option<&Value>) -> Result<String, ParamError> {
        let raw = match supplied {
            None | Some(Value::Null) => match self.default {
                Some(default) => return Ok(default.to_string()),
                None => {
                    return Err(ParamError(format!(
                        "missing required parameter `{}`",
                        self.name
                    )))
                }
            },
            Some(value) => value,
        };

        match self.kind {
            ParamKind::Text => match raw.as_str().map(str::trim) {
                Some(text) if !text.is_empty() => Ok(text.to_string()),
                _ => Err(self.invalid("a non-empty string")),
            },
            ParamKind::Integer { min, max } => match as_integer(raw) {
                Some(n) if n >= min && n <= max => Ok(n.to_string()),
                Some(_) => Err(self.invalid(&format!("an integer between {} and {}", min, max))),
                None => Err(self.invalid("an integer")),
            },
            ParamKind::Flag => match as_integer(raw) {
                Some(n @ (0 | 1)) => Ok(n.to_string()),
                _ => Err(self.invalid("0 or 1")),
            },
            ParamKind::Choice { options } => match raw.as_str() {
                Some(choice) if options.contains(&choice) => Ok(choice.to_string()),
                _ => Err(self.invalid(&format!("one of {}", options.join(", ")))),
            },
        }
    }

    fn invalid(&self, expected: &str) -> ParamError {
        ParamError(format!("parameter `{}` must be {}", self.name, expected))
    }
}

/// Accept JSON integers and integer strings
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

/// A single path segment that cannot be read as `.` or `..`
fn is_path_safe(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_alphanumeric())
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn query(request: &UpstreamRequest, key: &str) -> Option<String> {
        request
            .query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    #[test]
    fn test_catalog_names_unique() {
        let names: HashSet<&str> = CATALOG.iter().map(|d| d.name).collect();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn test_path_placeholders_have_params() {
        for def in CATALOG {
            for param in def.params.iter().filter(|p| p.placement == Placement::Path) {
                assert!(
                    def.path.contains(&format!("{{{}}}", param.name)),
                    "{} lacks placeholder for {}",
                    def.name,
                    param.name
                );
            }
            let placeholders = def.path.matches('{').count();
            let path_params = def.params.iter().filter(|p| p.placement == Placement::Path).count();
            assert_eq!(placeholders, path_params, "{}", def.name);
        }
    }

    #[test]
    fn test_defaults_validate() {
        for def in CATALOG {
            for param in def.params {
                if let Some(default) = param.default {
                    let supplied = match param.kind {
                        ParamKind::Text | ParamKind::Choice { .. } => json!(default),
                        _ => json!(default.parse::<i64>().unwrap()),
                    };
                    assert!(param.resolve(Some(&supplied)).is_ok(), "{}.{}", def.name, param.name);
                }
            }
        }
    }

    #[test]
    fn test_quote_detail_uses_defaults() {
        let request = find("quote_detail").unwrap().build_request(&Map::new()).unwrap();
        assert_eq!(request.host, Host::Stock);
        assert_eq!(request.path, "/v5/stock/quote.json");
        assert_eq!(request.auth, AuthMode::Token);
        assert_eq!(query(&request, "symbol").as_deref(), Some("SZ000002"));
        assert_eq!(query(&request, "extend").as_deref(), Some("detail"));
    }

    #[test]
    fn test_quotec_is_anonymous() {
        let request = find("quotec").unwrap().build_request(&Map::new()).unwrap();
        assert_eq!(request.auth, AuthMode::Anonymous);
    }

    #[test]
    fn test_kline_shapes_query() {
        let request = find("kline")
            .unwrap()
            .build_request(&args(json!({"stock_code": "SH600000", "period": "week", "count": 30})))
            .unwrap();

        assert_eq!(query(&request, "symbol").as_deref(), Some("SH600000"));
        assert_eq!(query(&request, "period").as_deref(), Some("week"));
        assert_eq!(query(&request, "count").as_deref(), Some("-30"));
        assert_eq!(query(&request, "type").as_deref(), Some("before"));
        let begin: u128 = query(&request, "begin").unwrap().parse().unwrap();
        assert!(begin > 1_600_000_000_000);
    }

    #[test]
    fn test_kline_rejects_unknown_period() {
        let err = find("kline")
            .unwrap()
            .build_request(&args(json!({"period": "2d"})))
            .unwrap_err();
        assert!(err.0.contains("period"));
    }

    #[test]
    fn test_finance_report_type() {
        let def = find("income").unwrap();
        let annual = def.build_request(&Map::new()).unwrap();
        assert_eq!(query(&annual, "type").as_deref(), Some("Q4"));

        let all = def.build_request(&args(json!({"is_annals": 0, "count": "8"}))).unwrap();
        assert_eq!(query(&all, "type").as_deref(), Some("all"));
        assert_eq!(query(&all, "count").as_deref(), Some("8"));
        assert_eq!(query(&all, "is_detail").as_deref(), Some("true"));
    }

    #[test]
    fn test_fund_path_substitution() {
        let request = find("fund_detail")
            .unwrap()
            .build_request(&args(json!({"fund_code": "110011"})))
            .unwrap();
        assert_eq!(request.host, Host::Danjuan);
        assert_eq!(request.path, "/djapi/fund/detail/110011");
        assert_eq!(request.auth, AuthMode::Anonymous);
    }

    #[test]
    fn test_convertible_bond_request() {
        let request = find("convertible_bond")
            .unwrap()
            .build_request(&args(json!({"page_size": 20})))
            .unwrap();
        assert_eq!(request.host, Host::Eastmoney);
        assert!(!request.requires_credential());
        assert_eq!(query(&request, "pageSize").as_deref(), Some("20"));
        assert_eq!(query(&request, "pageNumber").as_deref(), Some("1"));
        assert_eq!(query(&request, "reportName").as_deref(), Some("RPT_BOND_CB_LIST"));
    }

    #[test]
    fn test_missing_required_param() {
        let err = find("fund_detail").unwrap().build_request(&Map::new()).unwrap_err();
        assert_eq!(err.0, "missing required parameter `fund_code`");

        let err = find("watch_stock").unwrap().build_request(&Map::new()).unwrap_err();
        assert!(err.0.contains("pid"));
    }

    #[test]
    fn test_rejects_unsafe_path_value() {
        let err = find("fund_info")
            .unwrap()
            .build_request(&args(json!({"fund_code": "../admin"})))
            .unwrap_err();
        assert!(err.0.contains("fund_code"));
    }

    #[test]
    fn test_rejects_dot_segments() {
        let def = find("fund_info").unwrap();
        for value in [".", "..", "...", "-_."] {
            let err = def
                .build_request(&args(json!({ "fund_code": value })))
                .unwrap_err();
            assert!(err.0.contains("fund_code"), "{} accepted", value);
        }
        let request = def
            .build_request(&args(json!({"fund_code": "F.01"})))
            .unwrap();
        assert_eq!(request.path, "/djapi/fund/F.01");
    }

    #[test]
    fn test_rejects_unknown_and_mistyped_params() {
        let def = find("bonus").unwrap();
        assert!(def.build_request(&args(json!({"symbol": "SZ000002"}))).is_err());
        assert!(def.build_request(&args(json!({"page": "first"}))).is_err());
        assert!(def.build_request(&args(json!({"size": 0}))).is_err());
        assert!(def.build_request(&args(json!({"stock_code": ""}))).is_err());
        assert!(find("top_holders")
            .unwrap()
            .build_request(&args(json!({"circula": 2})))
            .is_err());
    }

    #[test]
    fn test_catalog_serializes_without_paths() {
        let listing = serde_json::to_value(find("kline").unwrap()).unwrap();
        assert_eq!(listing["name"], "kline");
        assert_eq!(listing["auth"], "token");
        assert!(listing.get("path").is_none());
        assert_eq!(listing["params"][1]["kind"]["type"], "choice");
    }
}
