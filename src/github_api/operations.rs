use crate::models::{BranchProtectionRule, BranchProtectionSettings, Environment, Repository,
	RepositoryBranchProtection, RepositoryInfo};

/// Acknowledgment of a mutation that doesn’t return the affected object.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationAcknowledgment
{
	/// Echo of the client mutation ID, which this client never sets.
	pub client_mutation_id: Option<String>,
}

impl super::Client
{
	/// Fetch a repository’s ID along with its first 10 branch protection rules.
	pub async fn show_branch_protection(&self, owner: &str, repository: &str)
		-> Result<RepositoryBranchProtection, crate::Error>
	{
		let data: RepositoryData<RepositoryBranchProtection> = self.execute("showBranchProtection",
			&RepositoryVariables{owner, repo: repository}).await?;

		Ok(data.repository)
	}

	/// Create a branch protection rule in the repository with the given ID.
	///
	/// Creating a rule for a pattern that already has one fails remotely.
	pub async fn add_branch_protection(&self, repository_id: &str,
		settings: &BranchProtectionSettings)
		-> Result<BranchProtectionRule, crate::Error>
	{
		settings.validate()?;

		let variables = AddBranchProtectionVariables
		{
			repository_id,
			branch_pattern: &settings.pattern,
			required_status_check_contexts: &settings.required_status_check_contexts,
			allows_deletions: settings.allows_deletions,
			allows_force_pushes: settings.allows_force_pushes,
			blocks_creations: settings.blocks_creations,
			dismisses_stale_reviews: settings.dismisses_stale_reviews,
			is_admin_enforced: settings.is_admin_enforced,
			requires_approving_reviews: settings.requires_approving_reviews,
			required_approving_review_count: settings.required_approving_review_count,
			requires_code_owner_reviews: settings.requires_code_owner_reviews,
			requires_status_checks: settings.requires_status_checks,
			restricts_pushes: settings.restricts_pushes,
			restricts_review_dismissals: settings.restricts_review_dismissals,
		};

		let data: CreateBranchProtectionRuleData =
			self.execute("addBranchProtection", &variables).await?;

		Ok(data.create_branch_protection_rule.branch_protection_rule)
	}

	/// Delete the branch protection rule with the given node ID.
	///
	/// Deleting a rule that no longer exists fails with a remote error.
	pub async fn delete_branch_protection(&self, rule_id: &str)
		-> Result<MutationAcknowledgment, crate::Error>
	{
		let data: DeleteBranchProtectionRuleData = self.execute("deleteBranchProtection",
			&DeleteBranchProtectionVariables{rule_id}).await?;

		Ok(data.delete_branch_protection_rule)
	}

	/// Fetch repository metadata along with its first 10 environments and their protection rules.
	pub async fn show_repository_info(&self, owner: &str, repository: &str)
		-> Result<RepositoryInfo, crate::Error>
	{
		let data: RepositoryData<RepositoryInfo> = self.execute("showRepositoryInfo",
			&RepositoryVariables{owner, repo: repository}).await?;

		Ok(data.repository)
	}

	/// Lazily list all repositories of an organization, one page at a time (for details, see
	/// [super::Client::paginate]).
	pub fn list_all_repos_in_org<'a>(&'a self, organization: &'a str)
		-> impl futures::Stream<Item = Result<Repository, crate::Error>> + 'a
	{
		let variables = ListRepositoriesVariables
		{
			org_login: organization,
			page_size: self.page_size(),
		};

		self.paginate("listAllReposInOrg", &variables, "/organization/repositories")
	}

	/// Create a deployment environment in the repository with the given ID.
	pub async fn create_environment(&self, repository_id: &str, name: &str)
		-> Result<Environment, crate::Error>
	{
		let data: CreateEnvironmentData = self.execute("createEnvironment",
			&CreateEnvironmentVariables{repository_id, name}).await?;

		Ok(data.create_environment.environment)
	}
}

#[doc(hidden)]
#[derive(serde::Serialize)]
struct RepositoryVariables<'a>
{
	owner: &'a str,
	repo: &'a str,
}

#[doc(hidden)]
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct AddBranchProtectionVariables<'a>
{
	repository_id: &'a str,
	branch_pattern: &'a str,
	required_status_check_contexts: &'a [String],
	allows_deletions: bool,
	allows_force_pushes: bool,
	blocks_creations: bool,
	dismisses_stale_reviews: bool,
	is_admin_enforced: bool,
	requires_approving_reviews: bool,
	required_approving_review_count: u32,
	requires_code_owner_reviews: bool,
	requires_status_checks: bool,
	restricts_pushes: bool,
	restricts_review_dismissals: bool,
}

#[doc(hidden)]
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteBranchProtectionVariables<'a>
{
	rule_id: &'a str,
}

#[doc(hidden)]
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRepositoriesVariables<'a>
{
	org_login: &'a str,
	page_size: u32,
}

#[doc(hidden)]
#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateEnvironmentVariables<'a>
{
	repository_id: &'a str,
	name: &'a str,
}

#[doc(hidden)]
#[derive(serde::Deserialize)]
struct RepositoryData<T>
{
	repository: T,
}

#[doc(hidden)]
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBranchProtectionRuleData
{
	create_branch_protection_rule: CreateBranchProtectionRulePayload,
}

#[doc(hidden)]
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBranchProtectionRulePayload
{
	branch_protection_rule: BranchProtectionRule,
}

#[doc(hidden)]
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteBranchProtectionRuleData
{
	delete_branch_protection_rule: MutationAcknowledgment,
}

#[doc(hidden)]
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateEnvironmentData
{
	create_environment: CreateEnvironmentPayload,
}

#[doc(hidden)]
#[derive(serde::Deserialize)]
struct CreateEnvironmentPayload
{
	environment: Environment,
}
