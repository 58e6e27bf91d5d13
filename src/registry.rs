//! Component-tag to stage-factory mapping, resolved once per installed challenge.
//!
//! Dynamic dispatch by string tag replaces reflection-style component lookup: the mapping
//! is populated once at process start, frozen by [`StageRegistryBuilder::build`], and
//! shared read-only across any number of concurrently open sessions.

// self
use crate::{
	_prelude::*,
	stage::{ConsentStage, FlowStage, RadiusProviderFormStage, consent, radius},
};

/// Factory constructing a fresh stage for one session.
pub type StageFactory = Box<dyn Fn() -> Box<dyn FlowStage> + Send + Sync>;

/// Immutable mapping from challenge component tags to stage factories.
///
/// Factories are stateless constructors, so no locking is needed after `build`; share
/// the registry behind an `Arc`.
pub struct StageRegistry {
	factories: HashMap<String, StageFactory>,
}
impl StageRegistry {
	/// Starts building a registry.
	pub fn builder() -> StageRegistryBuilder {
		StageRegistryBuilder { factories: HashMap::new() }
	}

	/// Constructs the stage registered for the component tag.
	///
	/// Fails with [`Error::UnknownStage`] for unregistered tags; the executor turns that
	/// into a generic unsupported-step failure rather than skipping the step.
	pub fn resolve(&self, component: &str) -> Result<Box<dyn FlowStage>> {
		self.factories
			.get(component)
			.map(|factory| factory())
			.ok_or_else(|| Error::UnknownStage { component: component.to_owned() })
	}

	/// Returns `true` when a factory is registered for the tag.
	pub fn is_registered(&self, component: &str) -> bool {
		self.factories.contains_key(component)
	}

	/// Registered component tags, for diagnostics.
	pub fn components(&self) -> impl Iterator<Item = &str> {
		self.factories.keys().map(String::as_str)
	}
}
impl Debug for StageRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StageRegistry")
			.field("components", &self.components().collect::<Vec<_>>())
			.finish()
	}
}

/// Builder collecting registrations before the mapping is frozen.
pub struct StageRegistryBuilder {
	factories: HashMap<String, StageFactory>,
}
impl StageRegistryBuilder {
	/// Registers a factory under the given component tag, replacing any previous one.
	pub fn register<F, S>(mut self, component: impl Into<String>, factory: F) -> Self
	where
		F: Fn() -> S + Send + Sync + 'static,
		S: FlowStage + 'static,
	{
		self.factories.insert(component.into(), Box::new(move || Box::new(factory())));

		self
	}

	/// Freezes the mapping.
	pub fn build(self) -> StageRegistry {
		StageRegistry { factories: self.factories }
	}
}

/// Registry carrying the built-in stages.
pub fn default_registry() -> StageRegistry {
	StageRegistry::builder()
		.register(consent::COMPONENT, ConsentStage::new)
		.register(radius::COMPONENT, RadiusProviderFormStage::new)
		.build()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn unregistered_components_fail_with_unknown_stage() {
		let registry = default_registry();
		let err = registry
			.resolve("ak-stage-telepathy")
			.err()
			.expect("Unregistered tag must not resolve.");

		assert!(matches!(err, Error::UnknownStage { ref component } if component == "ak-stage-telepathy"));
		assert!(!registry.is_registered("ak-stage-telepathy"));
	}

	#[test]
	fn built_in_stages_resolve_with_matching_tags() {
		let registry = default_registry();
		let consent_stage =
			registry.resolve(consent::COMPONENT).expect("Consent stage should resolve.");
		let radius_stage =
			registry.resolve(radius::COMPONENT).expect("Radius stage should resolve.");

		assert_eq!(consent_stage.component(), consent::COMPONENT);
		assert_eq!(radius_stage.component(), radius::COMPONENT);
	}

	#[test]
	fn later_registrations_replace_earlier_ones() {
		let registry = StageRegistry::builder()
			.register(consent::COMPONENT, ConsentStage::new)
			.register(consent::COMPONENT, ConsentStage::new)
			.build();

		assert_eq!(registry.components().count(), 1);
	}
}
