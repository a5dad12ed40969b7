use crate::ValidationError;

use graphql_parser::query as ast;

use super::document::{Definition, Fragment, Operation, OperationKind, SelectionSet,
	VariableDefinition};

/// The documents shipped with this tool, in the order they are loaded.
pub(crate) const BUNDLED_DOCUMENTS: &[&str] = &[
	include_str!("../../graphql/fragments.graphql"),
	include_str!("../../graphql/branch_protection.graphql"),
	include_str!("../../graphql/repository_info.graphql"),
	include_str!("../../graphql/list_repositories.graphql"),
	include_str!("../../graphql/environment.graphql"),
];

/// An operation with all fragment spreads inlined, ready to be sent to the graph endpoint.
#[derive(Clone, Debug)]
pub struct ComposedOperation
{
	pub name: String,
	pub kind: OperationKind,
	pub variables: Vec<VariableDefinition>,
	/// Self-contained query text without any fragment definitions.
	pub query: String,
}

impl ComposedOperation
{
	/// Whether this operation declares a variable with the given name.
	pub fn declares(&self, variable: &str) -> bool
	{
		self.variables.iter().any(|definition| definition.name == variable)
	}
}

/// Named operations and fragments collected from one or more GraphQL documents.
///
/// Fragments may be defined in a different document than the operations using them. They are
/// resolved only when an operation is composed, so documents can be added in any order.
#[derive(Debug, Default)]
pub struct Registry
{
	#[doc(hidden)]
	operations: std::collections::HashMap<String, Operation>,
	#[doc(hidden)]
	fragments: std::collections::HashMap<String, Fragment>,
}

impl Registry
{
	/// A registry holding the operations and fragments bundled with this tool.
	pub fn bundled() -> Result<Self, ValidationError>
	{
		let mut registry = Self::default();

		for document in BUNDLED_DOCUMENTS
		{
			registry.add_document(document)?;
		}

		Ok(registry)
	}

	/// Parse a document and register all operations and fragments defined in it.
	///
	/// Names must be unique across all documents of a registry. If the document fails to parse or
	/// redefines a name, nothing from it is registered.
	pub fn add_document(&mut self, source: &str) -> Result<(), ValidationError>
	{
		let definitions = super::document::parse(source)?;
		let mut operations = Vec::new();
		let mut fragments = Vec::new();

		for definition in definitions
		{
			match definition
			{
				Definition::Operation(operation) =>
				{
					if self.operations.contains_key(&operation.name)
						|| operations.iter().any(|other: &Operation| other.name == operation.name)
					{
						return Err(ValidationError::DuplicateOperation(operation.name));
					}

					operations.push(operation);
				},
				Definition::Fragment(fragment) =>
				{
					if self.fragments.contains_key(&fragment.name)
						|| fragments.iter().any(|other: &Fragment| other.name == fragment.name)
					{
						return Err(ValidationError::DuplicateFragment(fragment.name));
					}

					fragments.push(fragment);
				},
			}
		}

		self.operations.extend(operations.into_iter()
			.map(|operation| (operation.name.clone(), operation)));
		self.fragments.extend(fragments.into_iter()
			.map(|fragment| (fragment.name.clone(), fragment)));

		Ok(())
	}

	/// Names of all registered operations, in no particular order.
	pub fn operation_names(&self) -> impl Iterator<Item = &str>
	{
		self.operations.keys().map(String::as_str)
	}

	/// Build the named operation by inlining every fragment it references, directly or through
	/// other fragments.
	///
	/// Each spread `...name` becomes the inline fragment `... on TypeCondition { selection }`, and
	/// directives on the spread move to the inline fragment. References to undefined fragments,
	/// fragment cycles, and variables that are used but not declared are rejected.
	pub fn compose(&self, operation_name: &str) -> Result<ComposedOperation, ValidationError>
	{
		let operation = self.operations.get(operation_name)
			.ok_or_else(|| ValidationError::UnknownOperation(operation_name.to_owned()))?;

		let mut definition = operation.definition.clone();
		let selection_set = super::document::selection_set_mut(&mut definition);

		let mut expanding = Vec::new();
		self.inline_fragments(selection_set, &operation.name, &mut expanding)?;

		let mut used_variables = Vec::new();
		collect_variables(selection_set, &mut used_variables);

		if let Some(variable) = used_variables.into_iter()
			.find(|&variable| !operation.variables.iter()
				.any(|definition| definition.name == variable))
		{
			return Err(ValidationError::UndefinedVariable
			{
				variable: variable.to_owned(),
				operation: operation.name.clone(),
			});
		}

		let document = ast::Document{definitions: vec![ast::Definition::Operation(definition)]};

		Ok(ComposedOperation
		{
			name: operation.name.clone(),
			kind: operation.kind,
			variables: operation.variables.clone(),
			query: document.to_string(),
		})
	}

	#[doc(hidden)]
	fn inline_fragments(&self, selection_set: &mut SelectionSet, context: &str,
		expanding: &mut Vec<String>)
		-> Result<(), ValidationError>
	{
		for selection in &mut selection_set.items
		{
			let spread = match selection
			{
				ast::Selection::Field(field) =>
				{
					self.inline_fragments(&mut field.selection_set, context, expanding)?;
					continue;
				},
				ast::Selection::InlineFragment(inline_fragment) =>
				{
					self.inline_fragments(&mut inline_fragment.selection_set, context, expanding)?;
					continue;
				},
				ast::Selection::FragmentSpread(spread) => spread,
			};

			let fragment = self.fragments.get(&spread.fragment_name)
				.ok_or_else(|| ValidationError::UndefinedFragment
				{
					fragment: spread.fragment_name.clone(),
					referenced_in: context.to_owned(),
				})?;

			if expanding.contains(&fragment.name)
			{
				let mut cycle = expanding.clone();
				cycle.push(fragment.name.clone());

				return Err(ValidationError::FragmentCycle(cycle));
			}

			let mut nested_selection_set = fragment.definition.selection_set.clone();

			expanding.push(fragment.name.clone());
			self.inline_fragments(&mut nested_selection_set, &fragment.name, expanding)?;
			expanding.pop();

			let inline_fragment = ast::InlineFragment
			{
				position: spread.position,
				type_condition: Some(fragment.definition.type_condition.clone()),
				directives: std::mem::take(&mut spread.directives),
				selection_set: nested_selection_set,
			};

			*selection = ast::Selection::InlineFragment(inline_fragment);
		}

		Ok(())
	}
}

/// Collect the names of all variables referenced in arguments of fields and directives.
#[doc(hidden)]
fn collect_variables<'s>(selection_set: &'s SelectionSet, variables: &mut Vec<&'s str>)
{
	for selection in &selection_set.items
	{
		let (arguments, directives, nested_selection_set) = match selection
		{
			ast::Selection::Field(field) =>
				(&field.arguments[..], &field.directives[..], Some(&field.selection_set)),
			ast::Selection::InlineFragment(inline_fragment) =>
				(&[][..], &inline_fragment.directives[..], Some(&inline_fragment.selection_set)),
			ast::Selection::FragmentSpread(spread) => (&[][..], &spread.directives[..], None),
		};

		let values = arguments.iter()
			.chain(directives.iter().flat_map(|directive| directive.arguments.iter()))
			.map(|(_, value)| value);

		for value in values
		{
			collect_value_variables(value, variables);
		}

		if let Some(nested_selection_set) = nested_selection_set
		{
			collect_variables(nested_selection_set, variables);
		}
	}
}

#[doc(hidden)]
fn collect_value_variables<'s>(value: &'s ast::Value<'static, String>,
	variables: &mut Vec<&'s str>)
{
	match value
	{
		ast::Value::Variable(name) => variables.push(name),
		ast::Value::List(items) => items.iter()
			.for_each(|item| collect_value_variables(item, variables)),
		ast::Value::Object(fields) => fields.values()
			.for_each(|field| collect_value_variables(field, variables)),
		_ => (),
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	fn registry(documents: &[&str]) -> Registry
	{
		let mut registry = Registry::default();

		for document in documents
		{
			registry.add_document(document).unwrap();
		}

		registry
	}

	fn normalize(query: &str) -> String
	{
		query.split_whitespace().collect::<Vec<_>>().join(" ")
	}

	#[test]
	fn compose_inlines_nested_fragments()
	{
		let registry = registry(&[
			"query show($owner: String!) { repository(owner: $owner) { ...repo } }",
			"fragment repo on Repository { name creator { ...actor } }
			fragment actor on Actor { login ... on Node { id } }",
		]);

		let operation = registry.compose("show").unwrap();

		assert_eq!(normalize(&operation.query),
			"query show($owner: String!) { repository(owner: $owner) { ... on Repository { name \
				creator { ... on Actor { login ... on Node { id } } } } } }");
		assert_eq!(operation.kind, OperationKind::Query);
		assert!(operation.declares("owner"));
		assert!(!operation.declares("repo"));
	}

	#[test]
	fn compose_keeps_directives_of_spreads()
	{
		let registry = registry(&[
			"query show($full: Boolean!) { viewer { ...user @include(if: $full) } }
			fragment user on User { login name }",
		]);

		let operation = registry.compose("show").unwrap();

		assert_eq!(normalize(&operation.query),
			"query show($full: Boolean!) { viewer { ... on User @include(if: $full) { login name } \
				} }");
	}

	#[test]
	fn compose_expands_the_same_fragment_twice()
	{
		let registry = registry(&[
			"query pair { a { ...leaf } b { ...leaf } } fragment leaf on Leaf { x }",
		]);

		let operation = registry.compose("pair").unwrap();

		assert_eq!(normalize(&operation.query).matches("... on Leaf { x }").count(), 2);
	}

	#[test]
	fn compose_rejects_undefined_fragment()
	{
		let registry = registry(&[
			"query show { a { ...known } } fragment known on A { b { ...unknown } }",
		]);

		let error = registry.compose("show").unwrap_err();

		assert!(matches!(error,
			ValidationError::UndefinedFragment{ref fragment, ref referenced_in}
				if fragment == "unknown" && referenced_in == "known"));
	}

	#[test]
	fn compose_rejects_fragment_cycles()
	{
		let registry = registry(&[
			"query show { a { ...first } }
			fragment first on A { b { ...second } }
			fragment second on B { a { ...first } }",
		]);

		let error = registry.compose("show").unwrap_err();

		assert!(matches!(error, ValidationError::FragmentCycle(ref cycle)
			if cycle == &["first", "second", "first"]));
	}

	#[test]
	fn compose_rejects_undefined_variables()
	{
		let registry = registry(&[
			"query show($owner: String!) { repository(owner: $owner, name: $repo) { id } }",
		]);

		let error = registry.compose("show").unwrap_err();

		assert!(matches!(error,
			ValidationError::UndefinedVariable{ref variable, ..} if variable == "repo"));
	}

	#[test]
	fn compose_rejects_unknown_operation()
	{
		assert!(matches!(Registry::default().compose("missing").unwrap_err(),
			ValidationError::UnknownOperation(ref name) if name == "missing"));
	}

	#[test]
	fn add_document_rejects_duplicates_atomically()
	{
		let mut registry = registry(&["fragment shared on A { b }"]);

		let error = registry.add_document("query fresh { a } fragment shared on A { c }")
			.unwrap_err();

		assert!(matches!(error, ValidationError::DuplicateFragment(ref name) if name == "shared"));
		assert!(registry.operation_names().next().is_none());

		let error = registry.add_document("query twice { a } query twice { b }").unwrap_err();

		assert!(matches!(error, ValidationError::DuplicateOperation(ref name) if name == "twice"));
	}

	#[test]
	fn bundled_operations_compose()
	{
		let registry = Registry::bundled().unwrap();

		let mut names: Vec<_> = registry.operation_names().collect();
		names.sort_unstable();

		assert_eq!(names, [
			"addBranchProtection",
			"createEnvironment",
			"deleteBranchProtection",
			"listAllReposInOrg",
			"showBranchProtection",
			"showRepositoryInfo",
		]);

		for name in names
		{
			let operation = registry.compose(name).unwrap();

			// No spreads of named fragments may survive composition
			assert_eq!(operation.query.matches("...").count(),
				operation.query.matches("... on ").count(), "{name}");

			// The composed query is a valid document on its own
			super::super::document::parse(&operation.query).unwrap();
		}
	}

	#[test]
	fn bundled_add_branch_protection_uses_current_schema()
	{
		let operation = Registry::bundled().unwrap().compose("addBranchProtection").unwrap();

		assert_eq!(operation.kind, OperationKind::Mutation);

		for variable in ["repositoryId", "branchPattern", "requiredStatusCheckContexts",
			"blocksCreations", "restrictsPushes"]
		{
			assert!(operation.declares(variable), "missing ${variable}");
		}

		assert!(!operation.declares("requiredStatusChecks"));
	}
}
