use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::NwpError;

pub const GRIB_EXTENSION: &str = "grib2";
pub const INDEX_SUFFIX: &str = ".idx";
pub const SUBSET_MARKER: &str = "subset";

const RAP_BUCKET: &str = "https://noaa-rap-pds.s3.amazonaws.com";
const GFS_BUCKET: &str = "https://noaa-gfs-bdp-pds.s3.amazonaws.com";
const HRRR_BUCKET: &str = "https://noaa-hrrr-bdp-pds.s3.amazonaws.com";

pub const RAP_CYCLES: [&str; 4] = ["t00z", "t06z", "t12z", "t18z"];
pub const GFS_CYCLES: [&str; 4] = ["00", "06", "12", "18"];
pub const HRRR_LAST_HOUR: u8 = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Rap,
    Gfs,
    Hrrr,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Rap, ModelKind::Gfs, ModelKind::Hrrr];

    pub fn prefix(self) -> &'static str {
        match self {
            ModelKind::Rap => "rap",
            ModelKind::Gfs => "gfs",
            ModelKind::Hrrr => "hrrr",
        }
    }

    /// Ordered identity fields. Filenames are composed and parsed in exactly this order.
    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            ModelKind::Rap => RAP_FIELDS,
            ModelKind::Gfs => GFS_FIELDS,
            ModelKind::Hrrr => HRRR_FIELDS,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

impl FromStr for ModelKind {
    type Err = NwpError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rap" => Ok(ModelKind::Rap),
            "gfs" => Ok(ModelKind::Gfs),
            "hrrr" => Ok(ModelKind::Hrrr),
            _ => Err(NwpError::InvalidField {
                field: "model",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Date,
    Text,
    Hour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

const RAP_FIELDS: &[FieldSpec] = &[
    field("date", FieldKind::Date),
    field("cycle", FieldKind::Text),
    field("grid", FieldKind::Text),
    field("forecast", FieldKind::Text),
];

const GFS_FIELDS: &[FieldSpec] = &[
    field("date", FieldKind::Date),
    field("cycle", FieldKind::Text),
    field("product", FieldKind::Text),
    field("resolution", FieldKind::Text),
    field("forecast", FieldKind::Text),
];

const HRRR_FIELDS: &[FieldSpec] = &[
    field("date", FieldKind::Date),
    field("cycle", FieldKind::Hour),
    field("region", FieldKind::Text),
    field("product", FieldKind::Text),
    field("forecast", FieldKind::Text),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Date(NaiveDate),
    Text(String),
    Hour(u8),
}

impl FieldValue {
    pub fn encode(&self) -> String {
        match self {
            FieldValue::Date(date) => date.format("%Y%m%d").to_string(),
            FieldValue::Text(text) => text.clone(),
            FieldValue::Hour(hour) => format!("{hour:02}"),
        }
    }

    pub fn decode(spec: &FieldSpec, token: &str) -> Result<Self, NwpError> {
        let invalid = || NwpError::InvalidField {
            field: spec.name,
            value: token.to_string(),
        };
        match spec.kind {
            FieldKind::Date => {
                if token.len() != 8 || !token.chars().all(|ch| ch.is_ascii_digit()) {
                    return Err(invalid());
                }
                NaiveDate::parse_from_str(token, "%Y%m%d")
                    .map(FieldValue::Date)
                    .map_err(|_| invalid())
            }
            FieldKind::Hour => {
                if token.len() != 2 || !token.chars().all(|ch| ch.is_ascii_digit()) {
                    return Err(invalid());
                }
                token.parse().map(FieldValue::Hour).map_err(|_| invalid())
            }
            FieldKind::Text => {
                if token.is_empty() || token.contains('_') {
                    return Err(invalid());
                }
                Ok(FieldValue::Text(token.to_string()))
            }
        }
    }
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RapDescriptor {
    pub date: NaiveDate,
    pub cycle: String,
    pub grid: String,
    pub forecast: String,
}

impl Default for RapDescriptor {
    fn default() -> Self {
        Self {
            date: today(),
            cycle: RAP_CYCLES[0].to_string(),
            grid: "awp130".to_string(),
            forecast: "f00".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GfsDescriptor {
    pub date: NaiveDate,
    pub cycle: String,
    pub product: String,
    pub resolution: String,
    pub forecast: String,
}

impl Default for GfsDescriptor {
    fn default() -> Self {
        Self {
            date: today(),
            cycle: GFS_CYCLES[0].to_string(),
            product: "atmos".to_string(),
            resolution: "0p25".to_string(),
            forecast: "f000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HrrrDescriptor {
    pub date: NaiveDate,
    pub cycle: u8,
    pub region: String,
    pub product: String,
    pub forecast: String,
}

impl Default for HrrrDescriptor {
    fn default() -> Self {
        Self {
            date: today(),
            cycle: 0,
            region: "conus".to_string(),
            product: "wrfsfc".to_string(),
            forecast: "f00".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum Descriptor {
    Rap(RapDescriptor),
    Gfs(GfsDescriptor),
    Hrrr(HrrrDescriptor),
}

impl From<RapDescriptor> for Descriptor {
    fn from(value: RapDescriptor) -> Self {
        Descriptor::Rap(value)
    }
}

impl From<GfsDescriptor> for Descriptor {
    fn from(value: GfsDescriptor) -> Self {
        Descriptor::Gfs(value)
    }
}

impl From<HrrrDescriptor> for Descriptor {
    fn from(value: HrrrDescriptor) -> Self {
        Descriptor::Hrrr(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheFileKind {
    Full,
    Subset,
}

impl Descriptor {
    pub fn default_for(kind: ModelKind) -> Self {
        match kind {
            ModelKind::Rap => RapDescriptor::default().into(),
            ModelKind::Gfs => GfsDescriptor::default().into(),
            ModelKind::Hrrr => HrrrDescriptor::default().into(),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Descriptor::Rap(_) => ModelKind::Rap,
            Descriptor::Gfs(_) => ModelKind::Gfs,
            Descriptor::Hrrr(_) => ModelKind::Hrrr,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            Descriptor::Rap(d) => d.date,
            Descriptor::Gfs(d) => d.date,
            Descriptor::Hrrr(d) => d.date,
        }
    }

    pub fn values(&self) -> Vec<FieldValue> {
        match self {
            Descriptor::Rap(d) => vec![
                FieldValue::Date(d.date),
                FieldValue::Text(d.cycle.clone()),
                FieldValue::Text(d.grid.clone()),
                FieldValue::Text(d.forecast.clone()),
            ],
            Descriptor::Gfs(d) => vec![
                FieldValue::Date(d.date),
                FieldValue::Text(d.cycle.clone()),
                FieldValue::Text(d.product.clone()),
                FieldValue::Text(d.resolution.clone()),
                FieldValue::Text(d.forecast.clone()),
            ],
            Descriptor::Hrrr(d) => vec![
                FieldValue::Date(d.date),
                FieldValue::Hour(d.cycle),
                FieldValue::Text(d.region.clone()),
                FieldValue::Text(d.product.clone()),
                FieldValue::Text(d.forecast.clone()),
            ],
        }
    }

    pub fn from_values(kind: ModelKind, values: Vec<FieldValue>) -> Result<Self, NwpError> {
        let specs = kind.fields();
        if values.len() != specs.len() {
            return Err(NwpError::InvalidField {
                field: "fields",
                value: format!("expected {} values, got {}", specs.len(), values.len()),
            });
        }
        let mut reader = ValueReader {
            specs: specs.iter(),
            values: values.into_iter(),
        };
        let descriptor = match kind {
            ModelKind::Rap => Descriptor::Rap(RapDescriptor {
                date: reader.date()?,
                cycle: reader.text()?,
                grid: reader.text()?,
                forecast: reader.text()?,
            }),
            ModelKind::Gfs => Descriptor::Gfs(GfsDescriptor {
                date: reader.date()?,
                cycle: reader.text()?,
                product: reader.text()?,
                resolution: reader.text()?,
                forecast: reader.text()?,
            }),
            ModelKind::Hrrr => Descriptor::Hrrr(HrrrDescriptor {
                date: reader.date()?,
                cycle: reader.hour()?,
                region: reader.text()?,
                product: reader.text()?,
                forecast: reader.text()?,
            }),
        };
        Ok(descriptor)
    }

    pub fn url(&self) -> String {
        let date = self.date().format("%Y%m%d");
        match self {
            Descriptor::Rap(d) => format!(
                "{RAP_BUCKET}/rap.{date}/rap.{}.{}pgrb{}.{GRIB_EXTENSION}",
                d.cycle, d.grid, d.forecast
            ),
            Descriptor::Gfs(d) => format!(
                "{GFS_BUCKET}/gfs.{date}/{cycle}/{}/gfs.t{cycle}z.pgrb2.{}.{}",
                d.product,
                d.resolution,
                d.forecast,
                cycle = d.cycle
            ),
            Descriptor::Hrrr(d) => format!(
                "{HRRR_BUCKET}/hrrr.{date}/{}/hrrr.t{:02}z.{}{}.{GRIB_EXTENSION}",
                d.region, d.cycle, d.product, d.forecast
            ),
        }
    }

    pub fn index_url(&self) -> String {
        format!("{}{INDEX_SUFFIX}", self.url())
    }

    /// `<prefix>_<YYYYMMDD>_<field2>_..._<fieldN>`
    pub fn file_stem(&self) -> String {
        let mut parts = vec![self.kind().prefix().to_string()];
        parts.extend(self.values().iter().map(FieldValue::encode));
        parts.join("_")
    }

    pub fn file_name(&self) -> String {
        format!("{}.{GRIB_EXTENSION}", self.file_stem())
    }

    pub fn subset_file_name(&self) -> String {
        format!("{}.{SUBSET_MARKER}.{GRIB_EXTENSION}", self.file_stem())
    }

    pub fn local_path(&self, cache_root: &Utf8Path) -> Utf8PathBuf {
        cache_root
            .join(self.kind().prefix())
            .join(self.file_name())
    }

    pub fn parse(path: &Utf8Path) -> Result<Self, NwpError> {
        let name = path
            .file_name()
            .ok_or_else(|| NwpError::UnparsableCacheFilename(path.to_string()))?;
        parse_file_name(name).map(|(descriptor, _)| descriptor)
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_stem())
    }
}

pub fn parse_file_name(name: &str) -> Result<(Descriptor, CacheFileKind), NwpError> {
    let unparsable = || NwpError::UnparsableCacheFilename(name.to_string());

    let stem = name
        .strip_suffix(GRIB_EXTENSION)
        .and_then(|rest| rest.strip_suffix('.'))
        .ok_or_else(unparsable)?;
    let (stem, file_kind) = match stem
        .strip_suffix(SUBSET_MARKER)
        .and_then(|rest| rest.strip_suffix('.'))
    {
        Some(stem) => (stem, CacheFileKind::Subset),
        None => (stem, CacheFileKind::Full),
    };

    let mut tokens = stem.split('_');
    let kind: ModelKind = tokens
        .next()
        .and_then(|prefix| {
            ModelKind::ALL
                .into_iter()
                .find(|kind| kind.prefix() == prefix)
        })
        .ok_or_else(unparsable)?;

    let tokens = tokens.collect::<Vec<_>>();
    let specs = kind.fields();
    if tokens.len() != specs.len() {
        return Err(unparsable());
    }
    let values = specs
        .iter()
        .zip(tokens)
        .map(|(spec, token)| FieldValue::decode(spec, token))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| unparsable())?;
    let descriptor = Descriptor::from_values(kind, values).map_err(|_| unparsable())?;
    Ok((descriptor, file_kind))
}

struct ValueReader<S, V> {
    specs: S,
    values: V,
}

impl<'a, S, V> ValueReader<S, V>
where
    S: Iterator<Item = &'a FieldSpec>,
    V: Iterator<Item = FieldValue>,
{
    fn next(&mut self) -> Result<(&'a FieldSpec, FieldValue), NwpError> {
        match (self.specs.next(), self.values.next()) {
            (Some(spec), Some(value)) => Ok((spec, value)),
            _ => Err(NwpError::InvalidField {
                field: "fields",
                value: "too few values".to_string(),
            }),
        }
    }

    fn date(&mut self) -> Result<NaiveDate, NwpError> {
        match self.next()? {
            (_, FieldValue::Date(date)) => Ok(date),
            (spec, other) => Err(mismatch(spec, other)),
        }
    }

    fn text(&mut self) -> Result<String, NwpError> {
        match self.next()? {
            (_, FieldValue::Text(text)) => Ok(text),
            (spec, other) => Err(mismatch(spec, other)),
        }
    }

    fn hour(&mut self) -> Result<u8, NwpError> {
        match self.next()? {
            (_, FieldValue::Hour(hour)) => Ok(hour),
            (spec, other) => Err(mismatch(spec, other)),
        }
    }
}

fn mismatch(spec: &FieldSpec, value: FieldValue) -> NwpError {
    NwpError::InvalidField {
        field: spec.name,
        value: value.encode(),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn hrrr() -> Descriptor {
        HrrrDescriptor {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            cycle: 12,
            region: "conus".to_string(),
            product: "wrfsfc".to_string(),
            forecast: "f06".to_string(),
        }
        .into()
    }

    #[test]
    fn values_follow_field_order() {
        for kind in ModelKind::ALL {
            let descriptor = Descriptor::default_for(kind);
            let values = descriptor.values();
            assert_eq!(values.len(), kind.fields().len());
            for (spec, value) in kind.fields().iter().zip(&values) {
                let expected = match spec.kind {
                    FieldKind::Date => matches!(value, FieldValue::Date(_)),
                    FieldKind::Text => matches!(value, FieldValue::Text(_)),
                    FieldKind::Hour => matches!(value, FieldValue::Hour(_)),
                };
                assert!(expected, "{kind} field {} has wrong kind", spec.name);
            }
        }
    }

    #[test]
    fn hrrr_file_name() {
        assert_eq!(
            hrrr().file_name(),
            "hrrr_20240115_12_conus_wrfsfc_f06.grib2"
        );
        assert_eq!(
            hrrr().subset_file_name(),
            "hrrr_20240115_12_conus_wrfsfc_f06.subset.grib2"
        );
    }

    #[test]
    fn parse_subset_name() {
        let (descriptor, kind) =
            parse_file_name("hrrr_20240115_12_conus_wrfsfc_f06.subset.grib2").unwrap();
        assert_eq!(descriptor, hrrr());
        assert_eq!(kind, CacheFileKind::Subset);
    }

    #[test]
    fn parse_rejects_bad_date() {
        let err = parse_file_name("hrrr_20241315_12_conus_wrfsfc_f06.grib2").unwrap_err();
        assert_matches!(err, NwpError::UnparsableCacheFilename(_));
    }
}
