//! Prompt builders shared across the application.
//!
//! Domain services assemble their own specialised prompts; the builders here
//! cover the community and image workflows that are not tied to one domain
//! type.

/// Content moderation prompt for forum posts and comments.
pub fn moderation(content: &str) -> String {
    format!(
        "Review this content for a farming community forum:\n\n\
         Content: {}\n\n\
         Check for:\n\
         1. Inappropriate language or content\n\
         2. Spam or promotional content\n\
         3. Misinformation about farming practices\n\
         4. Off-topic content\n\n\
         Respond with:\n\
         - \"APPROPRIATE\" if content is suitable\n\
         - \"INAPPROPRIATE\" if content violates guidelines\n\
         - Brief reason if inappropriate",
        content
    )
}

/// Outcome of parsing a moderation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationVerdict {
    pub approved: bool,
    pub reason: Option<String>,
}

impl ModerationVerdict {
    /// Parse a free-text moderation response.
    ///
    /// "INAPPROPRIATE" must be checked before "APPROPRIATE" since the former
    /// contains the latter as a substring. Unrecognized responses approve.
    pub fn parse(response: &str) -> Self {
        let upper = response.to_uppercase();
        if upper.contains("INAPPROPRIATE") {
            Self {
                approved: false,
                reason: Some(response.trim().to_string()),
            }
        } else {
            Self {
                approved: true,
                reason: None,
            }
        }
    }
}

/// Community farming advice prompt.
pub fn farming_advice(question: &str, category: &str) -> String {
    format!(
        "As an experienced agricultural advisor, provide helpful advice for \
         this farming question:\n\n\
         Category: {}\n\
         Question: {}\n\n\
         Please provide:\n\
         1. Direct answer to the question\n\
         2. Practical implementation steps\n\
         3. Potential challenges and solutions\n\
         4. Additional resources or considerations\n\
         5. Regional considerations for South African farming\n\n\
         Keep the advice practical, actionable, and suitable for farmers of \
         all experience levels.",
        category, question
    )
}

/// Short summary prompt for long forum posts.
pub fn post_summary(content: &str) -> String {
    let excerpt: String = content.chars().take(500).collect();
    format!(
        "Create a brief summary (1-2 sentences) of this farming forum post:\n\n\
         {}\n\n\
         Focus on the main topic and key points.",
        excerpt
    )
}

/// Trending-topics prompt over a digest of recent community posts.
pub fn trending_topics(post_digest: &str) -> String {
    format!(
        "Based on recent farming community discussions, identify trending \
         topics and themes:\n\n\
         Recent Community Posts:\n{}\n\n\
         Please identify:\n\
         1. Top 5 trending farming topics\n\
         2. Common challenges being discussed\n\
         3. Popular crop types being mentioned\n\
         4. Seasonal concerns\n\
         5. Emerging opportunities or technologies\n\n\
         Format as a brief summary suitable for a community dashboard.",
        post_digest
    )
}

/// Analysis prompt for an uploaded crop or soil photo.
pub fn crop_image_analysis() -> String {
    "Please analyze this image and describe what you see in detail, including:\n\
     1. The main objects and features\n\
     2. Advice on how to care for this crop\n\
     3. If this is a soil sample, describe its properties"
        .to_string()
}
