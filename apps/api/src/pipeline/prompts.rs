// Prompt templates for each pipeline stage.
// Placeholders are replaced with `str::replace` before sending.

/// Skills extraction. Replace `{resume_text}` and `{user_prompt}`.
pub const SKILLS_PROMPT_TEMPLATE: &str = "Extract the skills from the resume below, then follow \
the user's instructions where they concern the resume itself.

RESUME:
{resume_text}

USER INSTRUCTIONS:
{user_prompt}";

/// Role suggestion. Replace `{skills}` and `{user_prompt}`.
pub const ROLES_PROMPT_TEMPLATE: &str = "Structured skills extracted from the candidate's resume:

{skills}

Suggest suitable job roles for this candidate.

USER INSTRUCTIONS:
{user_prompt}";

/// Live listings via the search_jobs tool. Replace `{titles}` and `{location}`.
pub const LISTINGS_PROMPT_TEMPLATE: &str = "Find current job listings for each of these job titles \
in {location}:

{titles}

Call the search tool once per title and location pair.";

/// Salary estimation. Replace `{titles}` and `{location}`.
pub const SALARY_PROMPT_TEMPLATE: &str = "Estimate salaries in {location} for these job titles:

{titles}";

/// Web search over listing sites. Replace `{titles}`.
pub const WEB_SEARCH_PROMPT_TEMPLATE: &str = "Find recent job openings for these job titles:

{titles}";

/// Renders titles as a markdown bullet list.
pub fn title_list(titles: &[String]) -> String {
    titles
        .iter()
        .map(|t| format!("- {t}"))
        .collect::<Vec<_>>()
        .join("\n")
}
