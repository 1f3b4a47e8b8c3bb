use chrono::{Duration, TimeZone, Utc};
use rand::Rng;
use uuid::Uuid;

// the server acts as the first one
const USER_NAMES: &[&str] = &["Sally", "Kyle", "Maria", "Tom"];

const NUM_POSTS: usize = 10;
const POST_BODY_WORDS: usize = 120;

const NUM_COMMENTS_PER_POST: usize = 25;
const COMMENT_MAX_WORDS: usize = 40;
/// Out of 100, chance that a comment answers an earlier one
const REPLY_PERCENT: u32 = 60;

fn gen_n_items(table: &str, n: usize, mut f: impl FnMut(usize) -> String) {
    println!("INSERT INTO {} VALUES", table);
    for i in 0..n {
        if i != 0 {
            println!(",");
        }
        print!("    {}", f(i));
    }
    println!();
    println!("ON CONFLICT DO NOTHING;");
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn main() {
    let mut rng = rand::thread_rng();

    // Generate users
    let mut users = Vec::new();
    gen_n_items("users", USER_NAMES.len(), |i| {
        let uuid = Uuid::new_v4().to_string();
        users.push(uuid.clone());
        format!("({}, {})", quote(&uuid), quote(USER_NAMES[i]))
    });

    // Generate posts
    let mut posts = Vec::new();
    gen_n_items("posts", NUM_POSTS, |_| {
        let uuid = Uuid::new_v4().to_string();
        posts.push(uuid.clone());
        format!(
            "({}, {}, {})",
            quote(&uuid),
            quote(&lipsum::lipsum_title()),
            quote(&lipsum::lipsum_words(POST_BODY_WORDS)),
        )
    });

    // Generate comments, replies always being more recent than what they answer
    let base_date = Utc.timestamp_opt(1_667_556_000, 0).unwrap();
    let mut comments = Vec::new();
    for post in &posts {
        let mut date = base_date;
        let mut in_post: Vec<String> = Vec::new();
        for _ in 0..NUM_COMMENTS_PER_POST {
            let uuid = Uuid::new_v4().to_string();
            date = date + Duration::minutes(rng.gen_range(1..600));
            let parent = match !in_post.is_empty() && rng.gen_range(0..100) < REPLY_PERCENT {
                true => quote(&in_post[rng.gen_range(0..in_post.len())]),
                false => String::from("NULL"),
            };
            comments.push(format!(
                "({}, {}, '{}', {}, {}, {})",
                quote(&uuid),
                quote(&lipsum::lipsum_words(rng.gen_range(1..=COMMENT_MAX_WORDS))),
                date.to_rfc3339(),
                quote(&users[rng.gen_range(0..users.len())]),
                quote(post),
                parent,
            ));
            in_post.push(uuid);
        }
    }
    gen_n_items("comments", comments.len(), |i| comments[i].clone());
}
