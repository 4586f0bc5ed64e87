use super::normalize::normalize_name;

/// Derived metric column.
pub const AA: &str = "ACTIEVE_AANSLUITINGEN";
/// Product type ("GAS", "ELK", ...).
pub const PS: &str = "PRODUCTSOORT";
pub const PCV: &str = "POSTCODE_VAN";
pub const PCT: &str = "POSTCODE_TOT";
/// Percentage of connections physically in service.
pub const FSP: &str = "FYSIEKE_STATUS_PERC";
/// Number of connections behind the postal range.
pub const AANT: &str = "AANSLUITINGEN_AANTAL";

/// Label variants seen across operators and years.
const COLUMN_ALIASES: &[(&str, &str)] = &[
    ("Aantal Aansluitingen", AANT),
    ("Aantal aansluitingen", AANT),
    ("aantal aansluitingen", AANT),
    ("aansluiting_aantal", AANT),
    ("%Leveringsrichting", "LEVERINGSRICHTING_PERC"),
    ("%Fysieke status", FSP),
    ("%Soort aansluiting", "SOORT_AANSLUITING_PERC"),
    ("Soort aansluiting Naam", "SOORT_AANSLUITING"),
    ("SJV", "SJV_GEMIDDELD"),
    ("%SJV laag tarief", "SJV_LAAG_TARIEF_PERC"),
    ("%Slimme Meter", "SLIMME_METER_PERC"),
];

/// Noise fields dropped before the metric is computed.
const PRIMARY_DROP: &[&str] = &[
    "MEETVERANTWOORDELIJKE",
    PS,
    "VERBRUIKSSEGMENT",
    "%Defintieve aansl (NRM)",
    "%Soort aansluiting",
    "Soort aansluiting Naam",
    "SJV_GEMIDDELD",
    "SJV_LAAG_TARIEF_PERC",
    "Gemiddeld aantal telwielen",
    "LANDCODE",
    "WOONPLAATS",
    "STRAATNAAM",
    "SOORT_AANSLUITING_PERC",
    "SOORT_AANSLUITING",
    "SLIMME_METER_PERC",
    "LEVERINGSRICHTING_PERC",
    "NETBEHEERDER",
    "NETGEBIED",
];

/// Raw inputs made redundant by the derived metric.
const POST_DROP: &[&str] = &[AANT, FSP];

/// Immutable mapping and filtering tables for the per-job pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Variant label → canonical label, applied after labels are normalized.
    pub column_aliases: Vec<(String, String)>,
    pub primary_drop: Vec<String>,
    pub post_drop: Vec<String>,
    pub product_type: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            column_aliases: COLUMN_ALIASES
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            // labels are upper-cased by the first mapping pass, so match them that way
            primary_drop: PRIMARY_DROP.iter().map(|s| normalize_name(s)).collect(),
            post_drop: POST_DROP.iter().map(|s| s.to_string()).collect(),
            product_type: "GAS".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn with_product_type(mut self, product_type: impl Into<String>) -> Self {
        self.product_type = product_type.into();
        self
    }
}
