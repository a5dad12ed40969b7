/// Cursor information of a paginated connection.
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo
{
	pub has_next_page: bool,
	/// Opaque cursor to pass as `endCursor` to fetch the next page.
	pub end_cursor: Option<String>,
}

/// A page of a connection as returned by the graph API.
///
/// Connections that are fetched with a fixed size (such as the first 10 branch protection rules)
/// don’t request page information, in which case [Connection::page_info] is left at its default.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: serde::Deserialize<'de>"))]
pub struct Connection<T>
{
	#[serde(default, deserialize_with = "null_as_default")]
	pub nodes: Vec<T>,
	#[serde(default)]
	pub page_info: PageInfo,
	#[serde(default)]
	pub total_count: Option<u64>,
}

impl<T> Default for Connection<T>
{
	fn default() -> Self
	{
		Self{nodes: Vec::new(), page_info: PageInfo::default(), total_count: None}
	}
}

/// Minimal identity of a user, bot, or organization.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor
{
	/// The actor’s handle.
	pub login: String,
	/// Global node ID, only present if the actor’s concrete type implements `Node`.
	#[serde(default)]
	pub id: Option<String>,
}

/// Repository metadata as selected by the `repositoryInfo` fragment.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository
{
	pub id: String,
	pub name: String,
	/// Owner-qualified name such as `pcdshub/typhos`.
	pub name_with_owner: String,
	pub description: Option<String>,
	pub homepage_url: Option<String>,
	pub is_archived: bool,
}

impl Repository
{
	/// Handle of the user or organization owning the repository.
	pub fn owner(&self) -> &str
	{
		self.name_with_owner.split_once('/').map_or("", |(owner, _)| owner)
	}
}

/// Repository metadata together with its deployment environments.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInfo
{
	#[serde(flatten)]
	pub repository: Repository,
	pub environments: Connection<Environment>,
}

/// A repository’s ID and name along with its branch protection rules.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryBranchProtection
{
	pub id: String,
	pub name: String,
	pub branch_protection_rules: Connection<BranchProtectionRule>,
}

/// A branch protection rule as selected by the `branchProtection` fragment.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchProtectionRule
{
	pub id: String,
	/// Glob matching the names of protected branches.
	pub pattern: String,
	pub allows_deletions: bool,
	pub allows_force_pushes: bool,
	#[serde(default)]
	pub blocks_creations: bool,
	pub dismisses_stale_reviews: bool,
	pub is_admin_enforced: bool,
	/// Only meaningful if [BranchProtectionRule::requires_approving_reviews] is set.
	pub required_approving_review_count: Option<u32>,
	#[serde(default, deserialize_with = "null_as_default")]
	pub required_status_check_contexts: Vec<String>,
	pub requires_approving_reviews: bool,
	pub requires_code_owner_reviews: bool,
	pub requires_status_checks: bool,
	pub restricts_pushes: bool,
	pub restricts_review_dismissals: bool,
	/// Missing if the creating account has been deleted.
	pub creator: Option<Actor>,
}

/// The policy of a branch protection rule to be created.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BranchProtectionSettings
{
	pub pattern: String,
	pub allows_deletions: bool,
	pub allows_force_pushes: bool,
	pub blocks_creations: bool,
	pub dismisses_stale_reviews: bool,
	pub is_admin_enforced: bool,
	pub requires_approving_reviews: bool,
	pub required_approving_review_count: u32,
	pub requires_code_owner_reviews: bool,
	pub requires_status_checks: bool,
	pub required_status_check_contexts: Vec<String>,
	pub restricts_pushes: bool,
	pub restricts_review_dismissals: bool,
}

impl BranchProtectionSettings
{
	/// Reject settings the graph API would silently misinterpret.
	pub fn validate(&self) -> Result<(), crate::ValidationError>
	{
		if !self.requires_approving_reviews && self.required_approving_review_count > 0
		{
			return Err(crate::ValidationError::ApprovingReviewCountWithoutReviews(
				self.required_approving_review_count));
		}

		Ok(())
	}
}

/// A deployment environment of a repository.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment
{
	pub id: String,
	pub name: String,
	#[serde(default)]
	pub protection_rules: Connection<DeploymentProtectionRule>,
}

/// A rule that has to be satisfied before deploying to an environment.
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentProtectionRule
{
	/// Wait timer in minutes.
	pub timeout: u32,
	#[serde(default)]
	pub reviewers: Connection<Reviewer>,
}

/// A team that may approve deployments.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team
{
	/// Organization-qualified team slug such as `pcdshub/python-reviewers`.
	pub combined_slug: String,
}

/// A user that may approve deployments.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User
{
	pub login: String,
	/// Profile name, if the user set one.
	pub name: Option<String>,
}

/// A reviewer of a deployment protection rule, which is either a team or a user.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Reviewer
{
	Team(Team),
	User(User),
	/// A reviewer of a type this client doesn’t know, carrying the reported type name.
	Unknown(String),
}

impl crate::graphql::Polymorphic for Reviewer
{
	const POSSIBLE_TYPES: &'static [&'static str] = &["Team", "User"];

	fn from_concrete(typename: &str, node: serde_json::Value) -> Result<Self, serde_json::Error>
	{
		match typename
		{
			"Team" => serde_json::from_value(node).map(Self::Team),
			_ => serde_json::from_value(node).map(Self::User),
		}
	}

	fn unknown(typename: String) -> Self
	{
		Self::Unknown(typename)
	}
}

crate::graphql::deserialize_polymorphic!(Reviewer);

impl std::fmt::Display for Reviewer
{
	fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result
	{
		match self
		{
			Self::Team(team) => write!(formatter, "team {}", team.combined_slug),
			Self::User(User{login, name: Some(name)}) => write!(formatter, "user {login} ({name})"),
			Self::User(User{login, name: None}) => write!(formatter, "user {login}"),
			Self::Unknown(typename) => write!(formatter, "unsupported reviewer type {typename}"),
		}
	}
}

/// The graph API reports empty lists as `null` in some places, treat those as empty.
#[doc(hidden)]
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: serde::Deserializer<'de>,
	T: Default + serde::Deserialize<'de>,
{
	let value: Option<T> = serde::Deserialize::deserialize(deserializer)?;

	Ok(value.unwrap_or_default())
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::graphql::resolve_polymorphic;
	use serde_json::json;

	#[test]
	fn resolve_user_reviewer()
	{
		let reviewer: Reviewer = resolve_polymorphic(json!({
			"__typename": "User",
			"login": "klauer",
			"name": "Ken Lauer",
		})).unwrap();

		assert_eq!(reviewer, Reviewer::User(User
		{
			login: "klauer".to_owned(),
			name: Some("Ken Lauer".to_owned()),
		}));
	}

	#[test]
	fn resolve_team_reviewer()
	{
		let reviewer: Reviewer = resolve_polymorphic(json!({
			"__typename": "Team",
			"combinedSlug": "pcdshub/python-reviewers",
		})).unwrap();

		assert_eq!(reviewer,
			Reviewer::Team(Team{combined_slug: "pcdshub/python-reviewers".to_owned()}));
	}

	#[test]
	fn resolve_unknown_reviewer_type()
	{
		let reviewer: Reviewer = resolve_polymorphic(json!({
			"__typename": "Bot",
			"login": "dependabot",
		})).unwrap();

		assert_eq!(reviewer, Reviewer::Unknown("Bot".to_owned()));
	}

	#[test]
	fn resolve_requires_discriminator()
	{
		// Structurally this is a user, but without “__typename” it must not be matched
		let error = resolve_polymorphic::<Reviewer>(json!({"login": "klauer", "name": null}))
			.unwrap_err();

		assert!(matches!(error, crate::TransportError::MissingTypename));
	}

	#[test]
	fn resolve_rejects_malformed_concrete_node()
	{
		let error = resolve_polymorphic::<Reviewer>(json!({"__typename": "Team"})).unwrap_err();

		assert!(matches!(error, crate::TransportError::DecodeResponseData(_)));
	}

	#[test]
	fn decode_nested_reviewers()
	{
		let rule: DeploymentProtectionRule = serde_json::from_value(json!({
			"timeout": 30,
			"reviewers": {
				"totalCount": 2,
				"nodes": [
					{"__typename": "Team", "combinedSlug": "pcdshub/ecs"},
					{"__typename": "User", "login": "zllentz", "name": null},
				],
			},
		})).unwrap();

		assert_eq!(rule.timeout, 30);
		assert_eq!(rule.reviewers.total_count, Some(2));
		assert_eq!(rule.reviewers.nodes[0].to_string(), "team pcdshub/ecs");
		assert_eq!(rule.reviewers.nodes[1].to_string(), "user zllentz");
	}

	#[test]
	fn decode_reviewer_without_discriminator_fails()
	{
		let error = serde_json::from_value::<Reviewer>(json!({"login": "zllentz"})).unwrap_err();

		assert!(error.to_string().contains("__typename"), "{error}");
	}

	#[test]
	fn decode_branch_protection_rule_with_null_lists()
	{
		let rule: BranchProtectionRule = serde_json::from_value(json!({
			"id": "BPR_1",
			"pattern": "gh-pages",
			"allowsDeletions": false,
			"allowsForcePushes": true,
			"blocksCreations": false,
			"dismissesStaleReviews": false,
			"isAdminEnforced": false,
			"requiredApprovingReviewCount": null,
			"requiredStatusCheckContexts": null,
			"requiresApprovingReviews": false,
			"requiresCodeOwnerReviews": false,
			"requiresStatusChecks": false,
			"restrictsPushes": false,
			"restrictsReviewDismissals": false,
			"creator": {"login": "klauer", "id": "U_1"},
		})).unwrap();

		assert!(rule.required_status_check_contexts.is_empty());
		assert_eq!(rule.required_approving_review_count, None);
		assert_eq!(rule.creator.map(|creator| creator.login).as_deref(), Some("klauer"));
	}

	#[test]
	fn repository_owner_from_qualified_name()
	{
		let repository: Repository = serde_json::from_value(json!({
			"id": "R_1",
			"name": "typhos",
			"nameWithOwner": "pcdshub/typhos",
			"description": null,
			"homepageUrl": "",
			"isArchived": false,
		})).unwrap();

		assert_eq!(repository.owner(), "pcdshub");
	}

	#[test]
	fn settings_reject_review_count_without_reviews()
	{
		let settings = BranchProtectionSettings
		{
			pattern: "gh-pages".to_owned(),
			required_approving_review_count: 1,
			..Default::default()
		};

		assert!(matches!(settings.validate(),
			Err(crate::ValidationError::ApprovingReviewCountWithoutReviews(1))));
	}
}
