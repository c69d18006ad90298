// ABOUTME: Compiles a stack definition and resolved variables into a deployment plan.
// ABOUTME: Resolves networks, dependency order, names, volumes, and interpolated values.

use nonempty::NonEmpty;
use tracing::debug;

use super::graph::DependencyGraph;
use super::{
    CompileError, CompileErrors, DeploymentPlan, DeploymentStep, MountKind, ResolvedNetwork,
    ResolvedVolume, VolumeMount,
};
use crate::manifest::{ServiceSpec, StackDefinition, VolumeSpec};
use crate::types::{ImageRef, OrderedMap, scoped_name};
use crate::variables::{Variable, VariableError, VariableResolver, VariableSet, interpolate};

/// Key of the network synthesized when a stack declares none.
const DEFAULT_NETWORK: &str = "default";

fn into_errors(errors: Vec<CompileError>) -> Result<(), CompileErrors> {
    match NonEmpty::from_vec(errors) {
        Some(errors) => Err(errors),
        None => Ok(()),
    }
}

fn is_bind_source(source: &str) -> bool {
    source.starts_with('/')
        || source.starts_with('.')
        || source.starts_with('~')
        || source.contains('/')
}

/// Compiles stacks for one target stack name.
#[derive(Debug, Clone)]
pub struct PlanCompiler {
    stack_name: String,
}

impl PlanCompiler {
    pub fn new(stack_name: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
        }
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    /// Resolve the stack's variables with `resolver`, then compile.
    ///
    /// Every missing or invalid variable is reported before anything else is
    /// looked at.
    pub fn compile_with(
        &self,
        stack: &StackDefinition,
        resolver: &VariableResolver,
    ) -> Result<DeploymentPlan, CompileErrors> {
        let variables = resolver
            .resolve_all(&stack.variables)
            .map_err(|errors| errors.map(CompileError::from))?;
        self.compile(stack, &variables)
    }

    /// Compile against an already resolved variable set.
    ///
    /// Declared defaults fill names the set lacks. A required variable with
    /// no value yields one error per name, all collected before failing.
    pub fn compile(
        &self,
        stack: &StackDefinition,
        variables: &VariableSet,
    ) -> Result<DeploymentPlan, CompileErrors> {
        let variables = self.effective_variables(stack, variables)?;

        let graph = DependencyGraph::from_services(&stack.services)?;
        let order = graph.order().map_err(NonEmpty::new)?;
        debug!(stack = %self.stack_name, order = ?graph.ordered_names().ok(), "service order");

        let networks = self.resolve_networks(stack);
        let mut volumes = self.declared_volumes(&stack.volumes);

        let mut errors = Vec::new();
        let mut steps = Vec::with_capacity(order.len());
        let services: Vec<(&str, &ServiceSpec)> = stack.services.iter().collect();
        for index in order {
            let (name, service) = services[index];
            match self.resolve_step(name, index, service, &networks, &mut volumes, &variables) {
                Ok(step) => steps.push(step),
                Err(mut step_errors) => errors.append(&mut step_errors),
            }
        }
        into_errors(errors)?;

        Ok(DeploymentPlan {
            stack_name: self.stack_name.clone(),
            steps,
            networks,
            volumes,
            variables,
        })
    }

    fn effective_variables(
        &self,
        stack: &StackDefinition,
        given: &VariableSet,
    ) -> Result<VariableSet, CompileErrors> {
        let mut variables = given.clone();
        let mut errors = Vec::new();
        for (name, spec) in stack.variables.iter() {
            let has_value = given.get(name).is_some_and(|v| !v.is_empty());
            if has_value {
                continue;
            }
            let variable = Variable::new(name, spec.clone());
            match variable.default_value() {
                Some(default) if !given.contains(name) => variables.insert(name, default),
                _ if variable.is_required() => errors.push(CompileError::Variable(
                    VariableError::MissingRequired {
                        name: name.to_string(),
                    },
                )),
                _ => {}
            }
        }
        into_errors(errors)?;
        Ok(variables)
    }

    fn resolve_networks(&self, stack: &StackDefinition) -> OrderedMap<ResolvedNetwork> {
        let mut networks = OrderedMap::new();
        if stack.networks.is_empty() {
            networks.insert(
                DEFAULT_NETWORK,
                ResolvedNetwork {
                    name: scoped_name(&self.stack_name, DEFAULT_NETWORK),
                    external: false,
                    driver: None,
                },
            );
            return networks;
        }

        for (key, spec) in stack.networks.iter() {
            let name = if spec.external {
                spec.name.clone().unwrap_or_else(|| key.to_string())
            } else {
                scoped_name(&self.stack_name, key)
            };
            networks.insert(
                key,
                ResolvedNetwork {
                    name,
                    external: spec.external,
                    driver: spec.driver.clone(),
                },
            );
        }
        networks
    }

    fn resolved_volume(&self, key: &str, spec: &VolumeSpec) -> ResolvedVolume {
        let name = if spec.external {
            spec.name.clone().unwrap_or_else(|| key.to_string())
        } else {
            scoped_name(&self.stack_name, key)
        };
        ResolvedVolume {
            name,
            external: spec.external,
            driver: spec.driver.clone(),
            driver_opts: spec.driver_opts.clone(),
        }
    }

    fn declared_volumes(&self, declared: &OrderedMap<VolumeSpec>) -> OrderedMap<ResolvedVolume> {
        declared
            .iter()
            .map(|(key, spec)| (key.to_string(), self.resolved_volume(key, spec)))
            .collect()
    }

    /// Parse `source:target[:mode]`. Named sources are registered in `volumes`.
    fn resolve_mount(
        &self,
        entry: &str,
        volumes: &mut OrderedMap<ResolvedVolume>,
    ) -> Option<VolumeMount> {
        let mut parts = entry.splitn(3, ':');
        let first = parts.next().filter(|s| !s.is_empty())?;
        let Some(target) = parts.next() else {
            return Some(VolumeMount {
                kind: MountKind::Anonymous,
                source: String::new(),
                target: first.to_string(),
                mode: None,
            });
        };
        if target.is_empty() {
            return None;
        }
        let mode = parts.next().map(str::to_string);

        if is_bind_source(first) {
            return Some(VolumeMount {
                kind: MountKind::Bind,
                source: first.to_string(),
                target: target.to_string(),
                mode,
            });
        }

        if !volumes.contains_key(first) {
            let implicit = self.resolved_volume(first, &VolumeSpec::default());
            volumes.insert(first, implicit);
        }
        let source = volumes
            .get(first)
            .map(|v| v.name.clone())
            .unwrap_or_else(|| scoped_name(&self.stack_name, first));

        Some(VolumeMount {
            kind: MountKind::Named,
            source,
            target: target.to_string(),
            mode,
        })
    }

    fn resolve_step(
        &self,
        name: &str,
        index: usize,
        service: &ServiceSpec,
        networks: &OrderedMap<ResolvedNetwork>,
        volumes: &mut OrderedMap<ResolvedVolume>,
        variables: &VariableSet,
    ) -> Result<DeploymentStep, Vec<CompileError>> {
        let render = |text: &str| interpolate(text, |var| variables.get(var));
        let mut errors = Vec::new();

        let image = service
            .image
            .as_deref()
            .map(render)
            .filter(|i| !i.trim().is_empty());
        if image.is_none() {
            errors.push(CompileError::MissingImage {
                service: name.to_string(),
            });
        }

        let container_name = match &service.container_name {
            Some(explicit) => render(explicit),
            None => scoped_name(&self.stack_name, name),
        };

        let ports: Vec<String> = service.ports.iter().map(|p| render(p)).collect();

        let mut mounts = Vec::with_capacity(service.volumes.len());
        for entry in &service.volumes {
            let rendered = render(entry);
            match self.resolve_mount(&rendered, volumes) {
                Some(mount) => mounts.push(mount),
                None => errors.push(CompileError::InvalidVolume {
                    service: name.to_string(),
                    entry: rendered,
                }),
            }
        }

        let mut service_networks = Vec::new();
        if service.networks.is_empty() {
            if let Some((_, first)) = networks.first() {
                service_networks.push(first.name.clone());
            }
        } else {
            for network in &service.networks {
                match networks.get(network) {
                    Some(resolved) => service_networks.push(resolved.name.clone()),
                    None => errors.push(CompileError::UnknownNetwork {
                        service: name.to_string(),
                        network: network.clone(),
                    }),
                }
            }
        }

        let environment: OrderedMap<String> = service
            .environment
            .iter()
            .map(|(k, v)| (k.to_string(), render(v)))
            .collect();
        let labels: OrderedMap<String> = service
            .labels
            .iter()
            .map(|(k, v)| (k.to_string(), render(v)))
            .collect();

        let image = match image {
            Some(image) if errors.is_empty() => image,
            _ => return Err(errors),
        };
        let version_tag = ImageRef::parse(&image)
            .ok()
            .and_then(|r| r.tag().map(str::to_string));

        debug!(stack = %self.stack_name, service = name, %image, "resolved step");

        Ok(DeploymentStep {
            service: name.to_string(),
            image,
            version_tag,
            container_name,
            internal: ports.is_empty(),
            networks: service_networks,
            environment,
            labels,
            ports,
            volumes: mounts,
            depends_on: service.depends_on.clone(),
            declaration_index: index,
            restart: service.restart.clone().unwrap_or_default(),
            command: service.command.as_ref().map(|c| c.interpolated(render)),
            entrypoint: service.entrypoint.as_ref().map(|c| c.interpolated(render)),
            working_dir: service.working_dir.as_deref().map(render),
            user: service.user.as_deref().map(render),
            healthcheck: service.healthcheck.clone(),
        })
    }
}
