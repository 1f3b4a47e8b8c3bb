#![cfg(test)]

use std::{cmp, fmt::Debug, ops::RangeTo, panic::AssertUnwindSafe, path::Path};

use remarks_api::{Comment, CommentId, Db, Post, PostId, User, UserId};
use remarks_mock_server::MockDb;
use sqlx::PgPool;

use crate::{db::PostgresDb, *};

const USER_NAMES: &[&str] = &["Sally", "Kyle", "Maria"];

/// Number of distinct post ids the fuzzer talks about
const NUM_POST_IDS: u8 = 4;

fn build_pg_cluster(data: &Path) -> Option<postgresfixture::cluster::Cluster> {
    let mut runtime = None;
    let mut best_version = None;
    for r in postgresfixture::runtime::Runtime::find_on_path() {
        if let Ok(v) = r.version() {
            match (&mut runtime, &mut best_version) {
                (None, None) => {
                    runtime = Some(r);
                    best_version = Some(v);
                }
                (Some(runtime), Some(best_version)) => {
                    if *best_version < v {
                        *runtime = r;
                        *best_version = v;
                    }
                }
                _ => unreachable!(),
            }
        }
    }
    Some(postgresfixture::cluster::Cluster::new(data, runtime?))
}

/// Runs `f` against a freshly migrated database in a throwaway cluster
///
/// Skipped when no postgres can be started here, eg. postgres is not in the
/// path or the tests run as root.
fn with_test_db<F>(name: &str, f: F)
where
    F: FnOnce(&tokio::runtime::Runtime, PgPool) + std::panic::UnwindSafe,
{
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt::try_init();
    }
    let lockfile = tempfile::tempfile().expect("creating tempfile");
    let datadir = tempfile::tempdir().expect("creating tempdir");
    let datadir_path: &Path = datadir.as_ref();
    let Some(cluster) = build_pg_cluster(datadir_path) else {
        eprintln!("skipping {name}: postgresql seems to not be installed in path");
        return;
    };
    let datadir_path: &str = datadir_path.to_str().expect("tempdir is not valid utf8");
    let res = postgresfixture::coordinate::run_and_destroy(&cluster, lockfile.into(), || {
        cluster
            .createdb("test_db")
            .expect("creating test_db database");
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("failed initializing tokio runtime");
        let pool = runtime.block_on(async move {
            let pool = create_sqlx_pool(&format!(
                "postgresql://?host={datadir_path}&dbname=test_db"
            ))
            .await
            .expect("creating sqlx pool");
            MIGRATOR
                .run(&pool)
                .await
                .expect("failed applying migrations");
            pool
        });
        f(&runtime, pool);
    });
    // panics from `f` are resumed by run_and_destroy, only cluster errors end up here
    if let Err(err) = res {
        eprintln!("skipping {name}: could not run a postgres cluster: {err:?}");
    }
}

macro_rules! do_sqlx_test {
    ( $name:ident, $gen:expr, $fn:expr ) => {
        #[test]
        fn $name() {
            with_test_db(stringify!($name), |runtime, pool| {
                let runtime = AssertUnwindSafe(runtime);
                let pool = AssertUnwindSafe(pool);
                bolero::check!()
                    .with_generator($gen)
                    .cloned()
                    .for_each(move |v| {
                        let pool: PgPool = (*pool).clone();
                        let res = std::panic::catch_unwind(AssertUnwindSafe(|| {
                            runtime.block_on(($fn)(pool.clone(), v))
                        }));
                        runtime.block_on(async {
                            sqlx::query(include_str!("../reset-test-db.sql"))
                                .execute(&pool)
                                .await
                                .expect("failed cleaning up database");
                        });
                        if let Err(e) = res {
                            std::panic::resume_unwind(e);
                        }
                    });
            });
        }
    };
}

#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
enum FuzzOp {
    AddUser {
        name: usize,
    },
    AddPost {
        id: u8,
    },
    FindUser {
        name: usize,
    },
    ListPosts,
    FetchPost {
        post: u8,
    },
    CreateComment {
        post: u8,
        author: usize,
        message: u8,
        /// `Some` picks any comment created so far, from any post
        parent: Option<usize>,
    },
}

fn resize_int(fuzz_id: usize, RangeTo { end }: RangeTo<usize>) -> Option<usize> {
    if end == 0 {
        return None;
    }
    let bucket_size = cmp::max(1, usize::MAX / end); // in case we rounded to 0
    let id = fuzz_id / bucket_size;
    Some(cmp::min(id, end - 1)) // in case id was actually over end - 1 due to rounding
}

fn post_id(id: u8) -> PostId {
    PostId(format!("{}", id % NUM_POST_IDS))
}

/// A comment with its ids replaced by their creation index, so that both
/// backends' comments can be compared
#[derive(Debug, PartialEq)]
struct CommentShape {
    index: Option<usize>,
    message: String,
    parent: Option<Option<usize>>,
    user: User,
}

fn shape(c: &Comment, known: &[CommentId]) -> CommentShape {
    let index = |id: &CommentId| known.iter().position(|k| k == id);
    CommentShape {
        index: index(&c.id),
        message: c.message.clone(),
        parent: c.parent_id.as_ref().map(index),
        user: c.user.clone(),
    }
}

type PostShape = (PostId, String, String, Option<Vec<CommentShape>>);

fn post_shape(p: Post, known: &[CommentId]) -> PostShape {
    let comments = p
        .comments
        .map(|l| l.iter().map(|c| shape(c, known)).collect());
    (p.id, p.title, p.body, comments)
}

fn compare<T>(name: &str, app_res: anyhow::Result<T>, mock_res: anyhow::Result<T>)
where
    T: Debug + PartialEq,
{
    match (app_res, mock_res) {
        (Ok(app), Ok(mock)) => assert_eq!(
            app, mock,
            "app and mock did not return the same result for {name}"
        ),
        (Err(_), Err(_)) => (),
        (app, mock) => {
            panic!("app and mock disagree on {name}: app returned {app:?}, mock returned {mock:?}")
        }
    }
}

struct ComparativeFuzzer {
    pool: PgPool,
    app: PostgresDb,
    mock: MockDb,
    users: Vec<UserId>,
    posts: Vec<PostId>,
    /// Ids of the comments created on each side, in creation order
    app_comments: Vec<CommentId>,
    mock_comments: Vec<CommentId>,
}

impl ComparativeFuzzer {
    fn new(pool: PgPool) -> ComparativeFuzzer {
        ComparativeFuzzer {
            app: PostgresDb::new(pool.clone()),
            pool,
            mock: MockDb::new(),
            users: Vec::new(),
            posts: Vec::new(),
            app_comments: Vec::new(),
            mock_comments: Vec::new(),
        }
    }

    async fn execute_fuzz_op(&mut self, op: FuzzOp) {
        match op {
            FuzzOp::AddUser { name } => {
                let name = USER_NAMES[name % USER_NAMES.len()];
                let id = self.mock.add_user(name).await;
                sqlx::query("INSERT INTO users (id, name) VALUES ($1, $2)")
                    .bind(&id.0)
                    .bind(name)
                    .execute(&self.pool)
                    .await
                    .expect("inserting user");
                self.users.push(id);
            }
            FuzzOp::AddPost { id } => {
                let id = post_id(id);
                if self.posts.contains(&id) {
                    return;
                }
                let (title, body) = (format!("Post {id}"), format!("Body of post {id}"));
                self.mock.add_post(&id.0, &title, &body).await;
                sqlx::query("INSERT INTO posts (id, title, body) VALUES ($1, $2, $3)")
                    .bind(&id.0)
                    .bind(&title)
                    .bind(&body)
                    .execute(&self.pool)
                    .await
                    .expect("inserting post");
                self.posts.push(id);
            }
            FuzzOp::FindUser { name } => {
                let name = USER_NAMES[name % USER_NAMES.len()];
                compare(
                    "FindUser",
                    self.app.find_user_by_name(name).await,
                    self.mock.find_user_by_name(name).await,
                )
            }
            FuzzOp::ListPosts => compare(
                "ListPosts",
                self.app.list_posts().await,
                self.mock.list_posts().await,
            ),
            FuzzOp::FetchPost { post } => {
                let post = post_id(post);
                compare(
                    "FetchPost",
                    self.app
                        .fetch_post(&post)
                        .await
                        .map(|p| p.map(|p| post_shape(p, &self.app_comments))),
                    self.mock
                        .fetch_post(&post)
                        .await
                        .map(|p| p.map(|p| post_shape(p, &self.mock_comments))),
                )
            }
            FuzzOp::CreateComment {
                post,
                author,
                message,
                parent,
            } => {
                let post = post_id(post);
                let author = match resize_int(author, ..self.users.len()) {
                    Some(i) => self.users[i].clone(),
                    None => UserId(String::from("nobody")),
                };
                let message = format!("message {message}");
                let unknown = CommentId(String::from("unknown"));
                let (app_parent, mock_parent) =
                    match parent.map(|p| resize_int(p, ..self.app_comments.len())) {
                        None => (None, None),
                        Some(Some(i)) => (
                            Some(&self.app_comments[i]),
                            Some(&self.mock_comments[i]),
                        ),
                        Some(None) => (Some(&unknown), Some(&unknown)),
                    };
                let app_res = self
                    .app
                    .create_comment(&post, &author, &message, app_parent)
                    .await;
                let mock_res = self
                    .mock
                    .create_comment(&post, &author, &message, mock_parent)
                    .await;
                if let (Ok(app), Ok(mock)) = (&app_res, &mock_res) {
                    self.app_comments.push(app.id.clone());
                    self.mock_comments.push(mock.id.clone());
                }
                compare(
                    "CreateComment",
                    app_res.map(|c| shape(&c, &self.app_comments)),
                    mock_res.map(|c| shape(&c, &self.mock_comments)),
                )
            }
        }
    }
}

do_sqlx_test!(
    compare_with_mock,
    bolero::generator::gen_with::<Vec<FuzzOp>>().len(1..40usize),
    |pool, test: Vec<FuzzOp>| async move {
        let mut fuzzer = ComparativeFuzzer::new(pool);
        for op in test {
            fuzzer.execute_fuzz_op(op).await;
        }
    }
);

#[test]
fn replies_stay_on_their_parent_post() {
    with_test_db("replies_stay_on_their_parent_post", |runtime, pool| {
        runtime.block_on(async move {
            let mut fuzzer = ComparativeFuzzer::new(pool);
            for op in [
                FuzzOp::AddUser { name: 0 },
                FuzzOp::AddPost { id: 2 },
                FuzzOp::AddPost { id: 1 },
                FuzzOp::AddPost { id: 3 },
                FuzzOp::ListPosts,
                FuzzOp::CreateComment {
                    post: 2,
                    author: 0,
                    message: 0,
                    parent: None,
                },
                // answers the comment on post 2 from post 1
                FuzzOp::CreateComment {
                    post: 1,
                    author: 0,
                    message: 1,
                    parent: Some(0),
                },
                FuzzOp::CreateComment {
                    post: 2,
                    author: 0,
                    message: 2,
                    parent: Some(0),
                },
                FuzzOp::FetchPost { post: 1 },
                FuzzOp::FetchPost { post: 2 },
                FuzzOp::FindUser { name: 0 },
            ] {
                fuzzer.execute_fuzz_op(op).await;
            }
            assert_eq!(fuzzer.app_comments.len(), 2);

            let err = fuzzer
                .app
                .create_comment(
                    &PostId(String::from("1")),
                    &fuzzer.users[0],
                    "misplaced",
                    Some(&fuzzer.app_comments[0]),
                )
                .await
                .expect_err("reply on another post than its parent");
            assert!(
                format!("{err:#}").contains("violates foreign key constraint"),
                "unexpected error {err:#}"
            );
            let post = fuzzer
                .app
                .fetch_post(&PostId(String::from("1")))
                .await
                .expect("fetching post")
                .expect("post exists");
            assert_eq!(post.comments, Some(Vec::new()));
        });
    });
}
