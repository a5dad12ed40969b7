//! Splitting GraphQL documents into the named operations and fragments they define.

use graphql_parser::query as ast;

use crate::ValidationError;

use super::variables::TypeRef;

pub(crate) type OperationDefinition = ast::OperationDefinition<'static, String>;
pub(crate) type FragmentDefinition = ast::FragmentDefinition<'static, String>;
pub(crate) type SelectionSet = ast::SelectionSet<'static, String>;

/// Whether an operation reads data, writes data, or subscribes to events.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperationKind
{
	Query,
	Mutation,
	Subscription,
}

/// A variable declared in an operation’s header, such as `$owner: String!`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariableDefinition
{
	pub name: String,
	pub type_ref: TypeRef,
	/// Variables with a default value may be omitted even if their type is non-null.
	pub has_default: bool,
}

/// A named query, mutation, or subscription as written in a document.
#[derive(Clone, Debug)]
pub struct Operation
{
	pub kind: OperationKind,
	pub name: String,
	pub variables: Vec<VariableDefinition>,
	pub(crate) definition: OperationDefinition,
}

/// A named fragment such as `fragment actor on Actor { login }`.
#[derive(Clone, Debug)]
pub struct Fragment
{
	pub name: String,
	pub type_condition: String,
	pub(crate) definition: FragmentDefinition,
}

/// A top-level definition in a GraphQL document.
#[derive(Clone, Debug)]
pub enum Definition
{
	Operation(Operation),
	Fragment(Fragment),
}

/// Parse a GraphQL document into its operation and fragment definitions.
///
/// Every operation needs a name, since operations are looked up by name.
pub fn parse(source: &str) -> Result<Vec<Definition>, ValidationError>
{
	let document = ast::parse_query::<String>(source)
		.map_err(ValidationError::ParseDocument)?
		.into_static();

	document.definitions.into_iter()
		.map(|definition| match definition
		{
			ast::Definition::Operation(definition) =>
				Operation::from_definition(definition).map(Definition::Operation),
			ast::Definition::Fragment(definition) =>
				Ok(Definition::Fragment(Fragment::from_definition(definition))),
		})
		.collect()
}

impl Operation
{
	#[doc(hidden)]
	fn from_definition(definition: OperationDefinition) -> Result<Self, ValidationError>
	{
		let (kind, position, name, variable_definitions) = match &definition
		{
			ast::OperationDefinition::Query(query) => (OperationKind::Query, query.position,
				query.name.as_ref(), &query.variable_definitions[..]),
			ast::OperationDefinition::Mutation(mutation) => (OperationKind::Mutation,
				mutation.position, mutation.name.as_ref(), &mutation.variable_definitions[..]),
			ast::OperationDefinition::Subscription(subscription) => (OperationKind::Subscription,
				subscription.position, subscription.name.as_ref(),
				&subscription.variable_definitions[..]),
			// The `{ … }` shorthand can’t carry a name
			ast::OperationDefinition::SelectionSet(selection_set) =>
				(OperationKind::Query, selection_set.span.0, None, &[][..]),
		};

		let name = name.cloned().ok_or(ValidationError::AnonymousOperation
		{
			line: position.line,
			column: position.column,
		})?;

		let variables = variable_definitions.iter()
			.map(|variable| VariableDefinition
			{
				name: variable.name.clone(),
				type_ref: TypeRef::from(&variable.var_type),
				has_default: variable.default_value.is_some(),
			})
			.collect();

		Ok(Self{kind, name, variables, definition})
	}
}

impl Fragment
{
	#[doc(hidden)]
	fn from_definition(definition: FragmentDefinition) -> Self
	{
		let ast::TypeCondition::On(type_condition) = &definition.type_condition;

		Self
		{
			name: definition.name.clone(),
			type_condition: type_condition.clone(),
			definition,
		}
	}
}

/// The top-level selection set of an operation.
pub(crate) fn selection_set_mut(definition: &mut OperationDefinition) -> &mut SelectionSet
{
	match definition
	{
		ast::OperationDefinition::Query(query) => &mut query.selection_set,
		ast::OperationDefinition::Mutation(mutation) => &mut mutation.selection_set,
		ast::OperationDefinition::Subscription(subscription) => &mut subscription.selection_set,
		ast::OperationDefinition::SelectionSet(selection_set) => selection_set,
	}
}
