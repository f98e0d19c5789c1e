use serde::Serialize;

use crate::domain::{Descriptor, FieldValue, GFS_CYCLES, ModelKind, RAP_CYCLES};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Domain {
    Date,
    OneOf { values: &'static [&'static str] },
    /// Zero-padded numbers, `prefix` followed by `width` digits, within any of `ranges`
    /// (inclusive start, inclusive end, step).
    Padded {
        prefix: &'static str,
        width: usize,
        ranges: &'static [(u32, u32, u32)],
    },
}

impl Domain {
    pub fn accepts(&self, token: &str) -> bool {
        match self {
            Domain::Date => true,
            Domain::OneOf { values } => values.contains(&token),
            Domain::Padded {
                prefix,
                width,
                ranges,
            } => {
                let Some(digits) = token.strip_prefix(prefix) else {
                    return false;
                };
                if digits.len() != *width || !digits.chars().all(|ch| ch.is_ascii_digit()) {
                    return false;
                }
                let Ok(number) = digits.parse::<u32>() else {
                    return false;
                };
                ranges.iter().any(|(start, end, step)| {
                    number >= *start && number <= *end && (number - start) % step == 0
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldCatalog {
    pub name: &'static str,
    pub description: &'static str,
    pub domain: Domain,
    pub default: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resolution {
    Fixed { km: f64 },
    Keyed {
        field: &'static str,
        table: &'static [(&'static str, f64)],
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelCatalog {
    pub model: ModelKind,
    pub name: &'static str,
    pub fields: &'static [FieldCatalog],
    pub resolution: Resolution,
}

impl ModelCatalog {
    pub fn field(&self, name: &str) -> Option<&FieldCatalog> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn resolution_km(&self, descriptor: &Descriptor) -> Option<f64> {
        match self.resolution {
            Resolution::Fixed { km } => Some(km),
            Resolution::Keyed { field, table } => {
                let token = field_token(descriptor, field)?;
                table
                    .iter()
                    .find(|(key, _)| *key == token)
                    .map(|(_, km)| *km)
            }
        }
    }
}

const DATE: FieldCatalog = FieldCatalog {
    name: "date",
    description: "Model initialization date (YYYYMMDD)",
    domain: Domain::Date,
    default: "today (UTC)",
};

const RAP: ModelCatalog = ModelCatalog {
    model: ModelKind::Rap,
    name: "Rapid Refresh",
    fields: &[
        DATE,
        FieldCatalog {
            name: "cycle",
            description: "Initialization time in zulu-hour notation",
            domain: Domain::OneOf { values: &RAP_CYCLES },
            default: "t00z",
        },
        FieldCatalog {
            name: "grid",
            description: "Output grid",
            domain: Domain::OneOf {
                values: &["awip32", "awp130", "awp236", "awp252"],
            },
            default: "awp130",
        },
        FieldCatalog {
            name: "forecast",
            description: "Forecast hour",
            domain: Domain::Padded {
                prefix: "f",
                width: 2,
                ranges: &[(0, 21, 1)],
            },
            default: "f00",
        },
    ],
    resolution: Resolution::Keyed {
        field: "grid",
        table: &[
            ("awip32", 32.463),
            ("awp130", 13.545),
            ("awp236", 40.635),
            ("awp252", 20.318),
        ],
    },
};

const GFS: ModelCatalog = ModelCatalog {
    model: ModelKind::Gfs,
    name: "Global Forecast System",
    fields: &[
        DATE,
        FieldCatalog {
            name: "cycle",
            description: "Initialization hour",
            domain: Domain::OneOf { values: &GFS_CYCLES },
            default: "00",
        },
        FieldCatalog {
            name: "product",
            description: "Product family",
            domain: Domain::OneOf {
                values: &["atmos", "wave"],
            },
            default: "atmos",
        },
        FieldCatalog {
            name: "resolution",
            description: "Grid spacing in degrees",
            domain: Domain::OneOf {
                values: &["0p25", "0p50", "1p00"],
            },
            default: "0p25",
        },
        FieldCatalog {
            name: "forecast",
            description: "Forecast hour",
            domain: Domain::Padded {
                prefix: "f",
                width: 3,
                ranges: &[(0, 120, 1), (123, 384, 3)],
            },
            default: "f000",
        },
    ],
    resolution: Resolution::Keyed {
        field: "resolution",
        table: &[("0p25", 27.75), ("0p50", 55.5), ("1p00", 111.0)],
    },
};

const HRRR: ModelCatalog = ModelCatalog {
    model: ModelKind::Hrrr,
    name: "High-Resolution Rapid Refresh",
    fields: &[
        DATE,
        FieldCatalog {
            name: "cycle",
            description: "Initialization hour",
            domain: Domain::Padded {
                prefix: "",
                width: 2,
                ranges: &[(0, 23, 1)],
            },
            default: "00",
        },
        FieldCatalog {
            name: "region",
            description: "Domain",
            domain: Domain::OneOf {
                values: &["alaska", "conus"],
            },
            default: "conus",
        },
        FieldCatalog {
            name: "product",
            description: "Output product",
            domain: Domain::OneOf {
                values: &["wrfnat", "wrfprs", "wrfsfc", "wrfsubh"],
            },
            default: "wrfsfc",
        },
        FieldCatalog {
            name: "forecast",
            description: "Forecast hour",
            domain: Domain::Padded {
                prefix: "f",
                width: 2,
                ranges: &[(0, 48, 1)],
            },
            default: "f00",
        },
    ],
    resolution: Resolution::Fixed { km: 3.0 },
};

pub fn describe(kind: ModelKind) -> &'static ModelCatalog {
    match kind {
        ModelKind::Rap => &RAP,
        ModelKind::Gfs => &GFS,
        ModelKind::Hrrr => &HRRR,
    }
}

pub fn validate(descriptor: &Descriptor) -> Vec<(&'static str, String)> {
    let catalog = describe(descriptor.kind());
    descriptor
        .kind()
        .fields()
        .iter()
        .zip(descriptor.values())
        .filter_map(|(spec, value)| {
            let token = value.encode();
            let accepted = catalog
                .field(spec.name)
                .map(|field| field.domain.accepts(&token))
                .unwrap_or(false);
            (!accepted).then_some((spec.name, token))
        })
        .collect()
}

fn field_token(descriptor: &Descriptor, name: &str) -> Option<String> {
    descriptor
        .kind()
        .fields()
        .iter()
        .zip(descriptor.values())
        .find(|(spec, _)| spec.name == name)
        .map(|(_, value)| match value {
            FieldValue::Text(text) => text,
            other => other.encode(),
        })
}
