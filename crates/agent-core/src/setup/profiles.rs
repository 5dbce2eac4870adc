//! Profile Generation
//!
//! Builds a varied population from fixed name, occupation, trait and value
//! pools. The same seed always yields the same profiles.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::Rng;

use agent_model::AgentProfile;

const FIRST_NAMES: &[&str] = &[
    "Mary", "John", "Aisha", "Wei", "Carlos", "Priya", "Olga", "Kwame", "Sofia", "Hiro",
    "Fatima", "Liam", "Noor", "Mateo", "Ingrid", "Tomas", "Amara", "Yusuf", "Elena", "Kenji",
];

const LAST_NAMES: &[&str] = &[
    "Jones", "Smith", "Okafor", "Chen", "Garcia", "Patel", "Ivanova", "Mensah", "Rossi", "Tanaka",
    "Haddad", "Murphy", "Khan", "Silva", "Larsen", "Novak", "Diallo", "Aydin", "Popescu", "Sato",
];

const OCCUPATIONS: &[&str] = &[
    "baker", "teacher", "nurse", "carpenter", "librarian", "software engineer", "barista",
    "painter", "shop owner", "mechanic", "gardener", "journalist",
];

const TRAITS: &[&str] = &[
    "curious", "patient", "outgoing", "reserved", "ambitious", "generous", "skeptical",
    "cheerful", "meticulous", "stubborn", "empathetic", "witty",
];

const VALUES: &[&str] = &[
    "family", "honesty", "independence", "community", "craftsmanship", "learning", "security",
    "adventure", "fairness", "tradition",
];

const BACKGROUNDS: &[&str] = &[
    "grew up in a small coastal town",
    "moved to the city for work a few years ago",
    "has lived in the neighborhood all their life",
    "recently returned from travelling abroad",
    "was raised by grandparents who ran a corner shop",
];

const GOALS: &[&str] = &[
    "Open a small business",
    "Learn to play an instrument",
    "Make new friends in the neighborhood",
    "Get a promotion at work",
    "Organize a community event",
    "Finish an important personal project before the deadline",
    "Spend more time outdoors",
    "Save money for a trip",
];

/// Generate agent ID
fn generate_agent_id(index: usize) -> String {
    format!("agent_{:04}", index)
}

/// Pick `count` distinct entries from `pool`
fn pick_distinct(pool: &[&str], count: usize, rng: &mut SmallRng) -> Vec<String> {
    pool.choose_multiple(rng, count.min(pool.len()))
        .map(|s| s.to_string())
        .collect()
}

fn pick<'a>(pool: &[&'a str], rng: &mut SmallRng) -> &'a str {
    pool[rng.gen_range(0..pool.len())]
}

/// Generate `count` profiles with ids `agent_0001` upward
pub fn generate_profiles(count: usize, rng: &mut SmallRng) -> Vec<AgentProfile> {
    (1..=count)
        .map(|index| {
            let mut profile = AgentProfile::new(
                generate_agent_id(index),
                pick(FIRST_NAMES, rng),
                pick(LAST_NAMES, rng),
            )
            .with_occupation(pick(OCCUPATIONS, rng));

            profile.age = Some(rng.gen_range(18..=80));
            profile.traits = pick_distinct(TRAITS, rng.gen_range(2..=3), rng);
            profile.values = pick_distinct(VALUES, 2, rng);
            profile.background = Some(pick(BACKGROUNDS, rng).to_string());
            profile.goals = pick_distinct(GOALS, rng.gen_range(1..=2), rng);
            profile
        })
        .collect()
}
