// ABOUTME: Custom serde deserializers for manifest fields.
// ABOUTME: Accepts the list/map/scalar spellings both manifest formats allow.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::types::OrderedMap;

/// Render a YAML scalar as the string a container runtime would see.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn key_to_string<E: serde::de::Error>(key: &Value) -> Result<String, E> {
    scalar_to_string(key)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| E::custom("mapping keys must be non-empty scalars"))
}

/// Optional scalar (string, number, or bool) rendered as a string.
pub fn optional_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => scalar_to_string(&v)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("expected a scalar value")),
    }
}

/// A list of scalars, or a single scalar treated as a one-element list.
pub fn scalar_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => items
            .iter()
            .map(|item| {
                scalar_to_string(item)
                    .ok_or_else(|| serde::de::Error::custom("list entries must be scalars"))
            })
            .collect(),
        other => scalar_to_string(&other)
            .map(|s| vec![s])
            .ok_or_else(|| serde::de::Error::custom("expected a list of scalars")),
    }
}

fn field(map: &Mapping, key: &str) -> Option<String> {
    map.get(key)
        .and_then(scalar_to_string)
        .filter(|value| !value.is_empty())
}

/// `[host_ip:][published:]target[/protocol]` from a long-form port entry.
fn short_port(map: &Mapping) -> Option<String> {
    let target = field(map, "target")?;
    let mut out = String::new();
    if let Some(host_ip) = field(map, "host_ip") {
        out.push_str(&host_ip);
        out.push(':');
    }
    if let Some(published) = field(map, "published") {
        out.push_str(&published);
        out.push(':');
    }
    out.push_str(&target);
    if let Some(protocol) = field(map, "protocol").filter(|p| p != "tcp") {
        out.push('/');
        out.push_str(&protocol);
    }
    Some(out)
}

/// `[source:]target[:ro]` from a long-form volume entry.
fn short_volume(map: &Mapping) -> Option<String> {
    let target = field(map, "target")?;
    let read_only = matches!(map.get("read_only"), Some(Value::Bool(true)));
    Some(match field(map, "source") {
        Some(source) if read_only => format!("{source}:{target}:ro"),
        Some(source) => format!("{source}:{target}"),
        None => target,
    })
}

fn short_form_list<E: serde::de::Error>(
    value: Value,
    what: &str,
    short: fn(&Mapping) -> Option<String>,
) -> Result<Vec<String>, E> {
    match value {
        Value::Sequence(items) => items
            .iter()
            .map(|item| match item {
                Value::Mapping(map) => short(map)
                    .ok_or_else(|| E::custom(format!("long-form {what} entries need a target"))),
                other => scalar_to_string(other)
                    .ok_or_else(|| E::custom(format!("{what} entries must be strings or mappings"))),
            })
            .collect(),
        other => scalar_list(other).map_err(E::custom),
    }
}

/// Port mappings in short (`"8080:80"`) or long (`{target: 80, published: 8080}`) form.
pub fn port_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    short_form_list(Value::deserialize(deserializer)?, "port", short_port)
}

/// Volume mounts in short (`"data:/srv"`) or long (`{source: data, target: /srv}`) form.
pub fn volume_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    short_form_list(Value::deserialize(deserializer)?, "volume", short_volume)
}

/// Names given either as a list or as the keys of a mapping.
///
/// Covers `depends_on: [db]` next to the long form
/// `depends_on: {db: {condition: service_healthy}}`, and the same for networks.
pub fn name_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Mapping(map) => map.keys().map(key_to_string::<D::Error>).collect(),
        Value::Sequence(_) | Value::String(_) => {
            scalar_list(value).map_err(serde::de::Error::custom)
        }
        _ => Err(serde::de::Error::custom("expected a list or mapping of names")),
    }
}

/// Key/value pairs given either as a mapping or as a `KEY=value` list.
///
/// A bare `KEY` list entry or a null mapping value becomes an empty string.
pub fn key_value_map<'de, D>(deserializer: D) -> Result<OrderedMap<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let mut out = OrderedMap::new();
    match value {
        Value::Null => {}
        Value::Mapping(map) => {
            for (k, v) in &map {
                let value = scalar_to_string(v).ok_or_else(|| {
                    serde::de::Error::custom("mapping values must be scalars")
                })?;
                out.insert(key_to_string::<D::Error>(k)?, value);
            }
        }
        Value::Sequence(items) => {
            for item in &items {
                let entry = scalar_to_string(item)
                    .ok_or_else(|| serde::de::Error::custom("list entries must be KEY=value"))?;
                match entry.split_once('=') {
                    Some((k, v)) => out.insert(k.trim(), v.to_string()),
                    None => out.insert(entry.trim(), String::new()),
                };
            }
        }
        _ => return Err(serde::de::Error::custom("expected a mapping or KEY=value list")),
    }
    Ok(out)
}

/// Map whose entries may be null (`volumes: {data: }`), defaulting each null.
pub fn nullable_entries<'de, D, V>(deserializer: D) -> Result<OrderedMap<V>, D::Error>
where
    D: serde::Deserializer<'de>,
    V: Deserialize<'de> + Default,
{
    let map = OrderedMap::<Option<V>>::deserialize(deserializer)?;
    Ok(map
        .into_iter()
        .map(|(k, v)| (k, v.unwrap_or_default()))
        .collect())
}
