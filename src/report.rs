use std::fmt::Write;

use crate::models::{
    Itinerary, LearningEnvironmentDetail, OutcomeIndicators, RecordIdentity, TeacherSkillDetail,
};

const SUPPORT_LIST_LIMIT: usize = 5;

/// Failing learning environments, lowest weighted score first.
pub fn environments_needing_support(
    details: &[LearningEnvironmentDetail],
    limit: usize,
) -> Vec<&LearningEnvironmentDetail> {
    let mut failing: Vec<&LearningEnvironmentDetail> = details
        .iter()
        .filter(|detail| !detail.uses_ltp_methods)
        .collect();
    failing.sort_by(|a, b| a.weighted_score.total_cmp(&b.weighted_score));
    failing.truncate(limit);
    failing
}

/// Teachers below the skills threshold, lowest average first.
pub fn teachers_needing_support(
    details: &[TeacherSkillDetail],
    limit: usize,
) -> Vec<&TeacherSkillDetail> {
    let mut failing: Vec<&TeacherSkillDetail> = details
        .iter()
        .filter(|detail| !detail.has_ltp_skills)
        .collect();
    failing.sort_by(|a, b| a.avg_score.total_cmp(&b.avg_score));
    failing.truncate(limit);
    failing
}

fn describe(identity: &RecordIdentity) -> String {
    let teacher = match (&identity.teacher_name, identity.teacher_id) {
        (Some(name), _) => Some(name.clone()),
        (None, Some(id)) => Some(format!("teacher #{id}")),
        (None, None) => None,
    };
    let school = match (&identity.school_name, identity.school_id) {
        (Some(name), _) => name.clone(),
        (None, Some(id)) => format!("school #{id}"),
        (None, None) => "unknown school".to_string(),
    };

    match teacher {
        Some(teacher) => format!("{teacher} ({school})"),
        None => school,
    }
}

pub fn build_report(indicators: &OutcomeIndicators, itinerary: Option<&Itinerary>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# LtP Outcome Indicators Report");
    match itinerary {
        Some(itinerary) => {
            let _ = writeln!(
                output,
                "Generated for {} (itinerary {}, {} to {})",
                itinerary.name, itinerary.id, itinerary.start_date, itinerary.end_date
            );
        }
        None => {
            let _ = writeln!(output, "Generated for itinerary {}", indicators.itinerary_id);
        }
    }

    let plans = &indicators.implementation_plans;
    let development = &indicators.development_plans;
    let lessons = &indicators.lesson_plans;
    let environments = &indicators.learning_environments;
    let skills = &indicators.teacher_skills;

    let _ = writeln!(output);
    let _ = writeln!(output, "## Headline Indicators");
    let _ = writeln!(
        output,
        "- Schools with implementation plans: {:.2}% ({} of {})",
        plans.percentage, plans.schools_with_plans, plans.total_schools
    );
    let _ = writeln!(
        output,
        "- Schools with LtP development plans: {:.2}% ({} of {})",
        development.percentage, development.schools_with_development_plans, development.total_schools
    );
    let _ = writeln!(
        output,
        "- Teachers with LtP lesson plans: {:.2}% ({} of {})",
        lessons.percentage, lessons.teachers_with_lesson_plans, lessons.total_teachers
    );
    let _ = writeln!(
        output,
        "- Learning environments using LtP methods: {:.2}% ({} of {}, avg score {:.2})",
        environments.percentage,
        environments.environments_using_ltp,
        environments.total_environments,
        environments.average_score
    );
    let _ = writeln!(
        output,
        "- Teachers with LtP skills: {:.2}% ({} of {}, avg score {:.2})",
        skills.percentage, skills.teachers_with_skills, skills.total_teachers, skills.average_score
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Reach");
    let _ = writeln!(
        output,
        "- Schools reached: {}",
        indicators.schools_reached.schools_reached
    );
    let _ = writeln!(
        output,
        "- Primary enrollment: {} ({} boys, {} girls) across {} school submissions",
        indicators.enrollment.total_enrollment,
        indicators.enrollment.boys_enrollment,
        indicators.enrollment.girls_enrollment,
        indicators.enrollment.school_count
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Learning Environments Needing Support");
    let low_environments =
        environments_needing_support(&environments.detailed_scores, SUPPORT_LIST_LIMIT);
    if low_environments.is_empty() {
        let _ = writeln!(output, "All observed learning environments met the threshold.");
    } else {
        for detail in low_environments {
            let _ = writeln!(
                output,
                "- {}: weighted score {:.2} (tone {}, effort {}, participation {:.2})",
                describe(&detail.identity),
                detail.weighted_score,
                detail.tone_score,
                detail.effort_score,
                detail.participation_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Teachers Needing Support");
    let low_teachers = teachers_needing_support(&skills.detailed_scores, SUPPORT_LIST_LIMIT);
    if low_teachers.is_empty() {
        let _ = writeln!(output, "All observed teachers met the skills threshold.");
    } else {
        for detail in low_teachers {
            let _ = writeln!(
                output,
                "- {}: average skill score {:.2}",
                describe(&detail.identity),
                detail.avg_score
            );
        }
    }

    output
}
