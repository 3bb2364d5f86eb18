use std::collections::BTreeMap;

use prometheus_parse::{Sample, Scrape, Value};
use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub upper_bound: f64,
    pub count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quantile {
    pub quantile: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricValue {
    Counter(f64),
    Gauge(f64),
    Untyped(f64),
    Histogram(Vec<Bucket>),
    Summary(Vec<Quantile>),
}

impl MetricValue {
    /// Scalar value of a counter. Untyped samples count too, since some
    /// exporters omit the TYPE line.
    pub fn as_counter(&self) -> Option<f64> {
        match self {
            Self::Counter(v) | Self::Untyped(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_gauge(&self) -> Option<f64> {
        match self {
            Self::Gauge(v) | Self::Untyped(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&Value> for MetricValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Counter(v) => Self::Counter(*v),
            Value::Gauge(v) => Self::Gauge(*v),
            Value::Untyped(v) => Self::Untyped(*v),
            Value::Histogram(buckets) => Self::Histogram(
                buckets
                    .iter()
                    .map(|b| Bucket {
                        upper_bound: b.less_than,
                        count: b.count,
                    })
                    .collect(),
            ),
            Value::Summary(quantiles) => Self::Summary(
                quantiles
                    .iter()
                    .map(|q| Quantile {
                        quantile: q.quantile,
                        value: q.count,
                    })
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub labels: BTreeMap<String, String>,
    pub value: MetricValue,
}

impl From<&Sample> for MetricSample {
    fn from(sample: &Sample) -> Self {
        Self {
            labels: sample
                .labels
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            value: MetricValue::from(&sample.value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricFamily {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    pub samples: Vec<MetricSample>,
}

impl MetricFamily {
    pub fn first_counter(&self) -> Result<f64> {
        let sample = self
            .samples
            .first()
            .ok_or_else(|| Error::MetricNotFound(self.name.clone()))?;
        sample.value.as_counter().ok_or_else(|| self.type_error("counter"))
    }

    pub fn counter_sum(&self) -> Result<f64> {
        self.samples.iter().try_fold(0.0, |total, sample| {
            sample
                .value
                .as_counter()
                .map(|v| total + v)
                .ok_or_else(|| self.type_error("counter"))
        })
    }

    pub fn with_label(&self, key: &str, value: &str) -> Vec<&MetricSample> {
        self.samples
            .iter()
            .filter(|s| s.labels.get(key).is_some_and(|v| v == value))
            .collect()
    }

    fn type_error(&self, expected: &'static str) -> Error {
        Error::MetricType {
            name: self.name.clone(),
            expected,
        }
    }
}

/// All metric families read from one scrape, keyed by family name.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct MetricsSnapshot {
    families: BTreeMap<String, MetricFamily>,
}

impl MetricsSnapshot {
    /// Newer collectors append `_total` to counters, so that spelling is tried
    /// when the exact name is absent.
    pub fn get(&self, name: &str) -> Option<&MetricFamily> {
        self.families
            .get(name)
            .or_else(|| self.families.get(&format!("{name}_total")))
    }

    pub fn metric(&self, name: &str) -> Result<&MetricFamily> {
        self.get(name)
            .ok_or_else(|| Error::MetricNotFound(name.to_string()))
    }

    pub fn counter(&self, name: &str) -> Result<f64> {
        self.metric(name)?.first_counter()
    }

    pub fn counter_sum(&self, name: &str) -> Result<f64> {
        self.metric(name)?.counter_sum()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.families.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Other(e.to_string()))
    }
}

pub fn parse_exposition(text: &str) -> Result<MetricsSnapshot> {
    let lines = text.lines().map(|line| Ok::<_, std::io::Error>(line.to_string()));
    let scrape = Scrape::parse(lines).map_err(|e| Error::MetricsParse(e.to_string()))?;

    let mut families: BTreeMap<String, MetricFamily> = BTreeMap::new();
    for sample in &scrape.samples {
        families
            .entry(sample.metric.clone())
            .or_insert_with(|| MetricFamily {
                name: sample.metric.clone(),
                help: scrape.docs.get(&sample.metric).cloned(),
                samples: Vec::new(),
            })
            .samples
            .push(MetricSample::from(sample));
    }

    Ok(MetricsSnapshot { families })
}
