use super::{Chapter, Course, Difficulty, Situation};
use crate::template::{SituationTemplate, TemplateVariable};

struct Scenario {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    icon: &'static str,
    context: &'static str,
    user_goal: &'static str,
    ai_role: &'static str,
    difficulty: Difficulty,
    tags: &'static [&'static str],
}

impl Scenario {
    fn into_situation(self, category: &str) -> Situation {
        Situation {
            id: self.id.to_string(),
            title: self.title.to_string(),
            description: self.description.to_string(),
            icon: self.icon.to_string(),
            context: self.context.to_string(),
            user_goal: self.user_goal.to_string(),
            ai_role: self.ai_role.to_string(),
            difficulty: self.difficulty,
            category: category.to_string(),
            tags: self.tags.iter().map(|t| t.to_string()).collect(),
            voice: None,
        }
    }
}

fn chapter(
    id: &str,
    title: &str,
    description: &str,
    order: u32,
    category: &str,
    scenarios: Vec<Scenario>,
) -> Chapter {
    Chapter {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        order,
        situations: scenarios
            .into_iter()
            .map(|s| s.into_situation(category))
            .collect(),
    }
}

pub(super) fn courses() -> Vec<Course> {
    vec![
        Course {
            id: "everyday-confidence".to_string(),
            title: "Everyday Confidence".to_string(),
            description: "Hold your ground in small, everyday social moments.".to_string(),
            category: "social".to_string(),
            color: "#6C5CE7".to_string(),
            icon: "🗣️".to_string(),
            enrollable: false,
            chapters: vec![
                chapter(
                    "small-talk",
                    "Small Talk",
                    "Start and keep light conversations going.",
                    1,
                    "social",
                    vec![
                        Scenario {
                            id: "coffee-line",
                            title: "Chat in the Coffee Line",
                            description: "Strike up a conversation with a stranger while waiting.",
                            icon: "☕",
                            context: "You are standing in a long line at a busy coffee shop. The person behind you sighs at the wait.",
                            user_goal: "Start a friendly conversation and keep it going for a few exchanges.",
                            ai_role: "You are a slightly bored but friendly stranger waiting in line for coffee. Respond naturally and let the user lead.",
                            difficulty: Difficulty::Easy,
                            tags: &["small-talk", "strangers"],
                        },
                        Scenario {
                            id: "neighbor-hallway",
                            title: "New Neighbor",
                            description: "Introduce yourself to a neighbor who just moved in.",
                            icon: "🏠",
                            context: "A new neighbor is carrying boxes into the apartment next to yours.",
                            user_goal: "Introduce yourself and offer help without being pushy.",
                            ai_role: "You are a tired new neighbor in the middle of moving. You are polite but a little guarded at first.",
                            difficulty: Difficulty::Easy,
                            tags: &["small-talk", "neighbors"],
                        },
                    ],
                ),
                chapter(
                    "saying-no",
                    "Saying No",
                    "Decline requests clearly and kindly.",
                    2,
                    "social",
                    vec![
                        Scenario {
                            id: "friend-favor",
                            title: "The Weekend Favor",
                            description: "A friend asks you to help them move on your only free day.",
                            icon: "📦",
                            context: "Your friend calls asking you to spend Saturday helping them move. You already have plans to rest.",
                            user_goal: "Decline the request while keeping the friendship warm.",
                            ai_role: "You are a persistent friend who really wants help moving. Push back a couple of times before accepting the answer.",
                            difficulty: Difficulty::Medium,
                            tags: &["boundaries", "friends"],
                        },
                        Scenario {
                            id: "street-fundraiser",
                            title: "Street Fundraiser",
                            description: "A fundraiser stops you on the street and asks for a monthly donation.",
                            icon: "📋",
                            context: "A fundraiser with a clipboard steps in front of you on your way to work.",
                            user_goal: "Politely decline to sign up and move on.",
                            ai_role: "You are an energetic street fundraiser trained to overcome objections. Stay upbeat and persistent.",
                            difficulty: Difficulty::Hard,
                            tags: &["boundaries", "strangers"],
                        },
                    ],
                ),
            ],
        },
        Course {
            id: "workplace-communication".to_string(),
            title: "Workplace Communication".to_string(),
            description: "Practice the conversations that shape your career.".to_string(),
            category: "professional".to_string(),
            color: "#00B894".to_string(),
            icon: "💼".to_string(),
            enrollable: true,
            chapters: vec![
                chapter(
                    "giving-updates",
                    "Giving Updates",
                    "Report progress and problems clearly.",
                    1,
                    "professional",
                    vec![Scenario {
                        id: "missed-deadline",
                        title: "The Missed Deadline",
                        description: "Tell your manager a deliverable will be late.",
                        icon: "⏰",
                        context: "A report you own is due tomorrow and will not be ready. Your manager has a one-on-one with you now.",
                        user_goal: "Explain the delay, take ownership and propose a new plan.",
                        ai_role: "You are a busy manager who dislikes surprises. Ask pointed questions about the cause and the new timeline.",
                        difficulty: Difficulty::Medium,
                        tags: &["manager", "accountability"],
                    }],
                ),
                chapter(
                    "negotiation",
                    "Negotiation",
                    "Ask for what you are worth.",
                    2,
                    "professional",
                    vec![
                        Scenario {
                            id: "salary-raise",
                            title: "Asking for a Raise",
                            description: "Make the case for a raise at your annual review.",
                            icon: "💰",
                            context: "It is your annual review. You have taken on more responsibility this year.",
                            user_goal: "Ask for a specific raise and back it up with your achievements.",
                            ai_role: "You are a fair but budget-conscious manager. Raise realistic objections about budget and timing.",
                            difficulty: Difficulty::Hard,
                            tags: &["manager", "salary"],
                        },
                        Scenario {
                            id: "scope-negotiation",
                            title: "Negotiating Scope",
                            description: "Push back on a new request that would overload your team.",
                            icon: "📐",
                            context: "A stakeholder asks your team to add a large feature two weeks before launch.",
                            user_goal: "Negotiate scope or timeline without damaging the relationship.",
                            ai_role: "You are an ambitious stakeholder who believes the feature is critical. Be willing to compromise if given good reasons.",
                            difficulty: Difficulty::Medium,
                            tags: &["stakeholders", "scope"],
                        },
                    ],
                ),
            ],
        },
    ]
}

pub(super) fn templates() -> Vec<SituationTemplate> {
    vec![
        SituationTemplate {
            id: "reject-call-center".to_string(),
            title: "Reject the Sales Call".to_string(),
            description: "A telemarketer will not take no for an answer.".to_string(),
            icon: "📞".to_string(),
            context: "You keep getting calls about {product}".to_string(),
            user_goal: "End the call firmly and ask to be removed from the list about {product}."
                .to_string(),
            ai_role: "You are a persistent call center agent selling {product}. Do not give up easily."
                .to_string(),
            difficulty: Difficulty::Easy,
            category: "social".to_string(),
            voice: None,
            variables: vec![TemplateVariable {
                name: "product".to_string(),
                default_value: Some("a car warranty".to_string()),
            }],
        },
        SituationTemplate {
            id: "return-item".to_string(),
            title: "Return an Item".to_string(),
            description: "Return a purchase at a store with a strict policy.".to_string(),
            icon: "🧾".to_string(),
            context: "You bought {item} at {store} last week and it stopped working.".to_string(),
            user_goal: "Get a refund or replacement for {item}.".to_string(),
            ai_role: "You are a customer service clerk at {store} who follows the return policy to the letter."
                .to_string(),
            difficulty: Difficulty::Medium,
            category: "customer service".to_string(),
            voice: None,
            variables: vec![
                TemplateVariable {
                    name: "item".to_string(),
                    default_value: Some("a pair of headphones".to_string()),
                },
                TemplateVariable {
                    name: "store".to_string(),
                    default_value: Some("the electronics store".to_string()),
                },
            ],
        },
    ]
}
