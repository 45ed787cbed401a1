// Instruction profiles for the five completion units.
// Each profile is the full behavioural contract handed to the hosted model.

use crate::agents::tools::{ESTIMATE_SALARY, SEARCH_JOBS, WEB_SEARCH};

/// Immutable definition of one completion unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionProfile {
    pub name: &'static str,
    pub role: &'static str,
    pub instructions: &'static str,
    /// Tool names resolved against the `ToolRegistry` at start-up.
    pub tools: &'static [&'static str],
    /// Whether the instructions ask for an embedded JSON document.
    pub emits_json: bool,
}

pub const RESUME_AGENT: InstructionProfile = InstructionProfile {
    name: "ResumeAgent",
    role: "Extracts skills from resume",
    instructions: "Given a resume, extract skills, education, experience, and certifications \
        in JSON format.\n\
        Use this shape:\n\
        {\"skills\": [...], \"education\": [...], \"experience\": [...], \"certifications\": [...]}",
    tools: &[],
    emits_json: true,
};

pub const JOB_ROLE_ANALYZER: InstructionProfile = InstructionProfile {
    name: "JobRoleAnalyzer",
    role: "Suggests suitable job roles based on skills",
    instructions: "You are a career advisor. Given structured skills in JSON format from a resume, \
        suggest 3-5 suitable job roles.\n\
        For each job role, include:\n\
        1. Job Title\n\
        2. Why it's a good fit based on the skills\n\
        3. Key technologies or competencies required for the role\n\
        Make suggestions relevant to the candidate's field.\n\
        Start each role with a line of the form `Job Title: <title>`.",
    tools: &[],
    emits_json: false,
};

pub const JOB_SEARCHING_AGENT: InstructionProfile = InstructionProfile {
    name: "JobSearchingAgent",
    role: "Finds job openings online based on provided job titles",
    instructions: "You are a job search assistant. You will be given a list of job titles.\n\n\
        For each job title:\n\
        - Use your tools to search for recent job openings.\n\
        - Focus on job websites like bdjobs.com, linkedin.com, or indeed.com.\n\
        - Provide job title and 3-5 job links for each.\n\
        - Return result in structured JSON format and Markdown.\n\n\
        Search query format example: \
        \"Junior Python Developer site:bdjobs.com OR site:linkedin.com OR site:indeed.com\"",
    tools: &[WEB_SEARCH],
    emits_json: true,
};

pub const SALARY_ESTIMATOR_AGENT: InstructionProfile = InstructionProfile {
    name: "SalaryEstimatorAgent",
    role: "Estimates salary for each job title",
    instructions: "You are a salary estimation assistant. You will be given job titles.\n\n\
        For each job title:\n\
        - Call the `estimate_salary` tool.\n\
        - Provide job title, estimated salary min-max range, and currency.\n\
        - Return the result in a structured JSON and Markdown table.",
    tools: &[ESTIMATE_SALARY],
    emits_json: true,
};

pub const JOB_SEARCH_AGENT: InstructionProfile = InstructionProfile {
    name: "JobSearchAgent",
    role: "Searches for jobs based on job title and location",
    instructions: "You are a job search agent. You will receive job titles and locations.\n\n\
        For each title and location:\n\
        - Call `search_jobs` tool with query like \"python developer jobs in Dhaka\".\n\
        - Return top job listings with title, company, location, apply link, and post date.\n\
        - Format response as a Markdown table and also return structured JSON.",
    tools: &[SEARCH_JOBS],
    emits_json: true,
};

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_profiles_have_distinct_names_and_instructions() {
        let all = [
            RESUME_AGENT,
            JOB_ROLE_ANALYZER,
            JOB_SEARCH_AGENT,
            SALARY_ESTIMATOR_AGENT,
            JOB_SEARCHING_AGENT,
        ];
        let names: HashSet<_> = all.iter().map(|p| p.name).collect();
        let instructions: HashSet<_> = all.iter().map(|p| p.instructions).collect();
        assert_eq!(names.len(), all.len());
        assert_eq!(instructions.len(), all.len());
    }

    #[test]
    fn test_tool_bearing_profiles() {
        assert!(RESUME_AGENT.tools.is_empty());
        assert!(JOB_ROLE_ANALYZER.tools.is_empty());
        assert_eq!(JOB_SEARCHING_AGENT.tools, &[WEB_SEARCH]);
        assert_eq!(SALARY_ESTIMATOR_AGENT.tools, &[ESTIMATE_SALARY]);
        assert_eq!(JOB_SEARCH_AGENT.tools, &[SEARCH_JOBS]);
    }

    #[test]
    fn test_web_search_profile_names_listing_sites() {
        for site in ["bdjobs.com", "linkedin.com", "indeed.com"] {
            assert!(JOB_SEARCHING_AGENT.instructions.contains(site));
        }
    }
}
