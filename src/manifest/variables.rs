// ABOUTME: Lists a manifest's variables in presentation order.
// ABOUTME: Grouped by first appearance of each group, then by declared order.

use super::{Manifest, SelectStackError, StackEntry};
use crate::types::OrderedMap;
use crate::variables::{Variable, VariableSpec};

fn sort_for_display(variables: &mut [Variable]) {
    let mut groups: Vec<Option<String>> = Vec::new();
    for v in variables.iter() {
        if !groups.contains(&v.spec.group) {
            groups.push(v.spec.group.clone());
        }
    }
    variables.sort_by_key(|v| {
        let rank = groups
            .iter()
            .position(|g| *g == v.spec.group)
            .unwrap_or(usize::MAX);
        (rank, v.spec.order.unwrap_or(i64::MAX))
    });
}

fn sorted(declarations: &OrderedMap<VariableSpec>) -> Vec<Variable> {
    let mut out: Vec<Variable> = declarations
        .iter()
        .map(|(name, spec)| Variable::new(name, spec.clone()))
        .collect();
    sort_for_display(&mut out);
    out
}

/// Shared variables first, then `extra` entries. An extra that redefines a
/// shared name replaces it in place.
fn layered<'a>(
    shared: &OrderedMap<VariableSpec>,
    extra: impl IntoIterator<Item = &'a OrderedMap<VariableSpec>>,
) -> Vec<Variable> {
    let mut out = sorted(shared);
    let mut specific: OrderedMap<VariableSpec> = OrderedMap::new();

    for declarations in extra {
        for (name, spec) in declarations.iter() {
            if let Some(existing) = out.iter_mut().find(|v| v.name == name) {
                existing.spec = spec.clone();
            } else if !specific.contains_key(name) {
                specific.insert(name, spec.clone());
            }
        }
    }

    out.extend(sorted(&specific));
    out
}

/// Every variable the manifest declares, across all inline stacks.
pub fn extract_variables(manifest: &Manifest) -> Vec<Variable> {
    let stacks = manifest.stacks.values().filter_map(|entry| match entry {
        StackEntry::Inline(def) => Some(&def.variables),
        StackEntry::Include(_) => None,
    });
    layered(&manifest.root.variables, stacks)
}

/// Variables for one stack: shared declarations, then the stack's own.
pub fn extract_stack_variables(
    manifest: &Manifest,
    stack: Option<&str>,
) -> Result<Vec<Variable>, SelectStackError> {
    if !manifest.is_multi_stack() {
        return Ok(sorted(&manifest.root.variables));
    }
    let selected = manifest.select_stack(stack)?;
    let own: OrderedMap<VariableSpec> = selected
        .variables
        .iter()
        .filter(|(name, _)| !manifest.root.variables.contains_key(name))
        .map(|(name, spec)| (name.to_string(), spec.clone()))
        .collect();
    let overrides: OrderedMap<VariableSpec> = selected
        .variables
        .iter()
        .filter(|(name, _)| manifest.root.variables.contains_key(name))
        .map(|(name, spec)| (name.to_string(), spec.clone()))
        .collect();
    Ok(layered(&manifest.root.variables, [&overrides, &own]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse;

    fn names(vars: &[Variable]) -> Vec<&str> {
        vars.iter().map(|v| v.name.as_str()).collect()
    }

    #[test]
    fn orders_by_group_then_order() {
        let text = r#"
metadata: {name: shop}
variables:
  SMTP_HOST: {group: mail, order: 2}
  DB_NAME: {group: database, order: 2}
  SMTP_PORT: {group: mail, order: 1}
  DB_USER: {group: database, order: 1}
  DB_PASS: {group: database}
services:
  web: {image: nginx}
"#;
        let vars = extract_variables(&parse(text).unwrap());
        assert_eq!(
            names(&vars),
            vec!["SMTP_PORT", "SMTP_HOST", "DB_USER", "DB_NAME", "DB_PASS"]
        );
    }

    #[test]
    fn shared_variables_come_before_stack_variables() {
        let text = r#"
metadata: {name: suite}
variables:
  DOMAIN: {default: example.com}
stacks:
  api:
    variables:
      API_KEY: {}
      DOMAIN: {default: api.example.com}
    services:
      api: {image: suite/api}
  web:
    variables:
      THEME: {default: dark}
    services:
      web: {image: suite/web}
"#;
        let manifest = parse(text).unwrap();
        let all = extract_variables(&manifest);
        assert_eq!(names(&all), vec!["DOMAIN", "API_KEY", "THEME"]);

        let api = extract_stack_variables(&manifest, Some("api")).unwrap();
        assert_eq!(names(&api), vec!["DOMAIN", "API_KEY"]);
        assert_eq!(api[0].default_value(), Some("api.example.com"));
    }

    #[test]
    fn multi_stack_without_name_is_rejected() {
        let text = r#"
metadata: {name: suite}
stacks:
  a: {services: {x: {image: x}}}
  b: {services: {y: {image: y}}}
"#;
        let manifest = parse(text).unwrap();
        assert_eq!(
            extract_stack_variables(&manifest, None).unwrap_err(),
            SelectStackError::StackRequired
        );
    }
}
