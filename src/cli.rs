use crate::{
    api::{ApiError, CancelToken},
    auth::AuthStore,
    config::Config,
    journal::Journal,
    routes::{self, Resolution, Route},
    stores::categories::CategoryStore,
    stores::posts::PostStore,
    stores::users::AdminStore,
    types::{
        CategoryRequest, ChangePasswordRequest, CreateUserRequest, EditProfileRequest,
        LoginRequest, PostRequest, RegisterRequest, Role,
    },
    upload, validate, Args,
};
use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub struct Context {
    pub args: Args,
    pub config: Config,
    pub session_id: String,
    pub auth: RefCell<AuthStore>,
    pub categories: RefCell<CategoryStore>,
    pub posts: RefCell<PostStore>,
    pub admin: RefCell<AdminStore>,
    pub journal: Rc<RefCell<Journal>>,
}

fn verbose(ctx: &Context, message: &str) {
    if ctx.args.verbose || ctx.args.debug {
        eprintln!("[VERBOSE] {}", message);
    }
}

pub fn run_once(ctx: &Context, line: &str) -> Result<()> {
    handle_command(ctx, line);
    Ok(())
}

pub fn run_repl(ctx: Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    let history_path = crate::config::state_dir().join("history.txt");
    let _ = rl.load_history(&history_path);

    println!("vitrina - type 'help' for commands, 'exit' to quit");
    if let Some(user) = ctx.auth.borrow().user() {
        println!("Session restored for {} ({})", user.name, user.role.as_str());
    }

    loop {
        match rl.readline(">>> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                if handle_command(&ctx, line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);
    Ok(())
}

/// Dispatch one command line. Returns true when the session should end.
fn handle_command(ctx: &Context, line: &str) -> bool {
    let tokens = match shell_words::split(line) {
        Ok(tokens) => tokens,
        Err(e) => {
            println!("Parse error: {}", e);
            return false;
        }
    };
    let Some(command) = tokens.first() else {
        return false;
    };
    let args = &tokens[1..];

    match command.as_str() {
        "exit" | "quit" => return true,
        "help" => print_help(),
        "session" => {
            println!("Session: {}", ctx.session_id);
            println!("Journal: {:?}", ctx.journal.borrow().path);
            println!("API: {}", ctx.config.api.base_url);
        }
        "whoami" => {
            let auth = ctx.auth.borrow();
            match auth.user() {
                Some(user) => println!(
                    "{} <{}> role={} authenticated={}",
                    user.name,
                    user.email,
                    user.role.as_str(),
                    auth.is_authenticated()
                ),
                None => println!("Not logged in"),
            }
        }
        "login" => handle_login(ctx, args),
        "register" => handle_register(ctx, args),
        "logout" => {
            ctx.auth.borrow_mut().logout();
            println!("Logged out");
        }
        "profile" => handle_profile(ctx, args),
        "password" => handle_password(ctx, args),
        "posts" => {
            let page = args.first().and_then(|s| s.parse().ok()).unwrap_or(1);
            if gate(ctx, Route::Home) {
                show_posts(ctx, page);
            }
        }
        "post" => match args.first() {
            Some(id) if gate(ctx, Route::Post) => show_post(ctx, id),
            Some(_) => {}
            None => println!("Usage: post <id>"),
        },
        "categories" => {
            if gate(ctx, Route::Categories) {
                show_categories(ctx);
            }
        }
        "category" => match args.first() {
            Some(id) if gate(ctx, Route::CategoryPosts) => show_category(ctx, id),
            Some(_) => {}
            None => println!("Usage: category <id>"),
        },
        "create-post" => handle_create_post(ctx, args),
        "edit-post" => handle_edit_post(ctx, args),
        "delete-post" => match args.first() {
            Some(id) if gate(ctx, Route::Dashboard) => {
                match ctx.posts.borrow_mut().delete(id, &CancelToken::new()) {
                    Ok(()) => println!("Deleted post {}", id),
                    Err(e) => report_api_error(&e),
                }
            }
            Some(_) => {}
            None => println!("Usage: delete-post <id>"),
        },
        "create-category" => handle_create_category(ctx, args),
        "edit-category" => handle_edit_category(ctx, args),
        "delete-category" => match args.first() {
            Some(id) if gate(ctx, Route::Dashboard) => {
                match ctx.categories.borrow_mut().delete(id, &CancelToken::new()) {
                    Ok(()) => println!("Deleted category {}", id),
                    Err(e) => report_api_error(&e),
                }
            }
            Some(_) => {}
            None => println!("Usage: delete-category <id>"),
        },
        "users" => {
            let page = args.first().and_then(|s| s.parse().ok()).unwrap_or(1);
            if gate(ctx, Route::Dashboard) {
                show_users(ctx, page);
            }
        }
        "create-user" => handle_create_user(ctx, args),
        "delete-user" => match args.first() {
            Some(id) if gate(ctx, Route::Dashboard) => {
                match ctx.admin.borrow_mut().delete(id, &CancelToken::new()) {
                    Ok(()) => println!("Deleted user {}", id),
                    Err(e) => report_api_error(&e),
                }
            }
            Some(_) => {}
            None => println!("Usage: delete-user <id>"),
        },
        "open" => match args.first().map(String::as_str) {
            Some(name) => match Route::from_str(name) {
                Some(route) => open_route(ctx, route),
                None => println!("Unknown route: {}", name),
            },
            None => println!("Usage: open <route>"),
        },
        _ => println!("Unknown command: {}", command),
    }
    false
}

fn print_help() {
    println!("Commands:");
    println!("  help                  - show commands");
    println!("  exit                  - quit");
    println!("  session               - show session info");
    println!("  whoami                - show the current user");
    println!("Account:");
    println!("  login <email> <password>");
    println!("  register <name> <email> <password> <confirm>");
    println!("  logout");
    println!("  profile [--name N] [--email E]");
    println!("  password <current> <new> <confirm>");
    println!("Catalog:");
    println!("  posts [page]          - list posts");
    println!("  post <id>             - show one post");
    println!("  categories            - list categories");
    println!("  category <id>         - show a category and its posts");
    println!("Admin:");
    println!("  create-post <title> <price> <category-id> [--description D] [--image PATH|URL]");
    println!("  edit-post <id> [--title T] [--price P] [--category C] [--description D] [--image PATH|URL]");
    println!("  delete-post <id>");
    println!("  create-category <name>");
    println!("  edit-category <id> <name>");
    println!("  delete-category <id>");
    println!("  users [page]          - list accounts");
    println!("  create-user <name> <email> <password> <role>");
    println!("  delete-user <id>");
    println!("Navigation:");
    println!("  open <route>          - open a view by route name");
}

/// Resolve a command's route through its gate. Returns true when the view
/// may proceed; a redirect renders its destination instead.
fn gate(ctx: &Context, route: Route) -> bool {
    let resolution = routes::resolve(route, &ctx.auth.borrow());
    match resolution {
        Resolution::Render => {
            let _ = ctx.journal.borrow_mut().view(route.as_str(), "render");
            true
        }
        Resolution::Loading => {
            let _ = ctx.journal.borrow_mut().view(route.as_str(), "loading");
            println!("Session still resolving, try again.");
            false
        }
        Resolution::Redirect(dest) => {
            let _ = ctx.journal.borrow_mut().view(route.as_str(), "redirect");
            verbose(ctx, &format!("{} redirected to {}", route, dest));
            println!("-> {}", dest);
            render_destination(ctx, dest);
            false
        }
    }
}

/// Render the view a gate redirected to.
fn render_destination(ctx: &Context, dest: Route) {
    match dest {
        Route::Home => show_posts(ctx, 1),
        Route::Dashboard => show_dashboard(ctx),
        Route::Login => println!("Please log in: login <email> <password>"),
        Route::Forbidden => println!("403: your role does not allow this view"),
        _ => {}
    }
}

fn open_route(ctx: &Context, route: Route) {
    if !gate(ctx, route) {
        return;
    }
    match route {
        Route::Home => show_posts(ctx, 1),
        Route::Categories => show_categories(ctx),
        Route::Dashboard => show_dashboard(ctx),
        Route::Settings => show_settings(ctx),
        Route::Login => println!("login <email> <password>"),
        Route::Register => println!("register <name> <email> <password> <confirm>"),
        Route::Post => println!("Usage: post <id>"),
        Route::CategoryPosts => println!("Usage: category <id>"),
        Route::CreatePost => println!("Usage: create-post <title> <price> <category-id> ..."),
        Route::EditPost => println!("Usage: edit-post <id> ..."),
        Route::Forbidden => println!("403: your role does not allow this view"),
        Route::NotFound => println!("404 Not Found"),
    }
}

fn handle_login(ctx: &Context, args: &[String]) {
    if !gate(ctx, Route::Login) {
        return;
    }
    let [email, password] = args else {
        println!("Usage: login <email> <password>");
        return;
    };
    if let Err(errors) = validate::login(email, password) {
        report_form_errors(&errors);
        return;
    }

    let req = LoginRequest {
        email: email.clone(),
        password: password.clone(),
    };
    let result = ctx.auth.borrow_mut().login(&req);
    match result {
        Ok(user) => {
            println!("Logged in as {} ({})", user.name, user.role.as_str());
            // Land on the role's home view.
            if user.role.is_admin() {
                show_dashboard(ctx);
            } else {
                show_posts(ctx, 1);
            }
        }
        Err(e) => report_error(&e),
    }
}

fn handle_register(ctx: &Context, args: &[String]) {
    if !gate(ctx, Route::Register) {
        return;
    }
    let [name, email, password, confirm] = args else {
        println!("Usage: register <name> <email> <password> <confirm>");
        return;
    };
    if let Err(errors) = validate::registration(name, email, password, confirm) {
        report_form_errors(&errors);
        return;
    }

    let req = RegisterRequest {
        name: name.clone(),
        email: email.clone(),
        password: password.clone(),
    };
    let result = ctx.auth.borrow_mut().register(&req);
    match result {
        Ok(user) => println!("Welcome, {}", user.name),
        Err(e) => report_error(&e),
    }
}

fn handle_profile(ctx: &Context, args: &[String]) {
    if !gate(ctx, Route::Settings) {
        return;
    }
    let flags = match parse_flags(args) {
        Ok(flags) => flags,
        Err(e) => {
            println!("{}", e);
            println!("Usage: profile [--name N] [--email E]");
            return;
        }
    };
    let name = flags.get("name").cloned();
    let email = flags.get("email").cloned();
    if let Err(errors) = validate::profile_edit(&name, &email) {
        report_form_errors(&errors);
        return;
    }

    let req = EditProfileRequest { name, email };
    let result = ctx.auth.borrow_mut().edit_profile(&req);
    match result {
        Ok(user) => println!("Profile updated: {} <{}>", user.name, user.email),
        Err(e) => report_error(&e),
    }
}

fn handle_password(ctx: &Context, args: &[String]) {
    if !gate(ctx, Route::Settings) {
        return;
    }
    let [current, new, confirm] = args else {
        println!("Usage: password <current> <new> <confirm>");
        return;
    };
    if let Err(errors) = validate::password_change(current, new, confirm) {
        report_form_errors(&errors);
        return;
    }

    let req = ChangePasswordRequest {
        current_password: current.clone(),
        new_password: new.clone(),
    };
    let result = ctx.auth.borrow_mut().edit_password(&req);
    match result {
        Ok(message) => println!("{}", message),
        Err(e) => report_error(&e),
    }
}

fn handle_create_post(ctx: &Context, args: &[String]) {
    if !gate(ctx, Route::CreatePost) {
        return;
    }
    if args.len() < 3 {
        println!("Usage: create-post <title> <price> <category-id> [--description D] [--image PATH|URL]");
        return;
    }
    let title = args[0].clone();
    let Ok(price) = args[1].parse::<f64>() else {
        println!("price must be a number, got '{}'", args[1]);
        return;
    };
    let category = args[2].clone();
    let flags = match parse_flags(&args[3..]) {
        Ok(flags) => flags,
        Err(e) => {
            println!("{}", e);
            return;
        }
    };
    let description = flags.get("description").cloned().unwrap_or_default();
    if let Err(errors) = validate::post_form(&title, &description, price, &category) {
        report_form_errors(&errors);
        return;
    }
    let image = match resolve_image(ctx, flags.get("image")) {
        Ok(image) => image,
        Err(e) => {
            report_error(&e);
            return;
        }
    };

    let req = PostRequest {
        title,
        description,
        image,
        price,
        category,
    };
    let result = ctx.posts.borrow_mut().create(&req, &CancelToken::new());
    match result {
        Ok(post) => println!("Created post {} ({})", post.id, post.title),
        Err(e) => report_api_error(&e),
    }
}

fn handle_edit_post(ctx: &Context, args: &[String]) {
    if !gate(ctx, Route::EditPost) {
        return;
    }
    let Some((id, rest)) = args.split_first() else {
        println!("Usage: edit-post <id> [--title T] [--price P] [--category C] [--description D] [--image PATH|URL]");
        return;
    };
    let flags = match parse_flags(rest) {
        Ok(flags) => flags,
        Err(e) => {
            println!("{}", e);
            return;
        }
    };
    if flags.is_empty() {
        println!("Nothing to change");
        return;
    }

    // The server expects a full payload; start from the current record.
    let current = match ctx.posts.borrow_mut().get(id, &CancelToken::new()) {
        Ok(post) => post,
        Err(e) => {
            report_api_error(&e);
            return;
        }
    };

    let title = flags.get("title").cloned().unwrap_or(current.title);
    let description = flags
        .get("description")
        .cloned()
        .unwrap_or(current.description);
    let category = flags.get("category").cloned().unwrap_or(current.category);
    let price = match flags.get("price") {
        Some(raw) => match raw.parse::<f64>() {
            Ok(price) => price,
            Err(_) => {
                println!("price must be a number, got '{}'", raw);
                return;
            }
        },
        None => current.price,
    };
    if let Err(errors) = validate::post_form(&title, &description, price, &category) {
        report_form_errors(&errors);
        return;
    }
    let image = match flags.get("image") {
        Some(_) => match resolve_image(ctx, flags.get("image")) {
            Ok(image) => image,
            Err(e) => {
                report_error(&e);
                return;
            }
        },
        None if current.image.is_empty() => None,
        None => Some(current.image),
    };

    let req = PostRequest {
        title,
        description,
        image,
        price,
        category,
    };
    let result = ctx.posts.borrow_mut().update(id, &req, &CancelToken::new());
    match result {
        Ok(post) => println!("Updated post {} ({})", post.id, post.title),
        Err(e) => report_api_error(&e),
    }
}

fn handle_create_category(ctx: &Context, args: &[String]) {
    if !gate(ctx, Route::Dashboard) {
        return;
    }
    let name = args.join(" ");
    if let Err(errors) = validate::category_form(&name) {
        report_form_errors(&errors);
        return;
    }

    let req = CategoryRequest { name };
    let result = ctx.categories.borrow_mut().create(&req, &CancelToken::new());
    match result {
        Ok(category) => println!("Created category {} ({})", category.id, category.name),
        Err(e) => report_api_error(&e),
    }
}

fn handle_edit_category(ctx: &Context, args: &[String]) {
    if !gate(ctx, Route::Dashboard) {
        return;
    }
    let Some((id, rest)) = args.split_first() else {
        println!("Usage: edit-category <id> <name>");
        return;
    };
    let name = rest.join(" ");
    if let Err(errors) = validate::category_form(&name) {
        report_form_errors(&errors);
        return;
    }

    let req = CategoryRequest { name };
    let result = ctx
        .categories
        .borrow_mut()
        .update(id, &req, &CancelToken::new());
    match result {
        Ok(category) => println!("Updated category {} ({})", category.id, category.name),
        Err(e) => report_api_error(&e),
    }
}

fn handle_create_user(ctx: &Context, args: &[String]) {
    if !gate(ctx, Route::Dashboard) {
        return;
    }
    let [name, email, password, role] = args else {
        println!("Usage: create-user <name> <email> <password> <role>");
        return;
    };
    let Some(role) = Role::from_str(role) else {
        println!("Unknown role: {}. Valid: user, admin, superadmin", role);
        return;
    };
    if let Err(errors) = validate::user_form(name, email, password) {
        report_form_errors(&errors);
        return;
    }

    let req = CreateUserRequest {
        name: name.clone(),
        email: email.clone(),
        password: password.clone(),
        rol: role,
    };
    let result = ctx.admin.borrow_mut().create(&req, &CancelToken::new());
    match result {
        Ok(user) => println!("Created user {} ({})", user.id, user.email),
        Err(e) => report_api_error(&e),
    }
}

/// An `--image` argument may be a URL (used as-is) or a local path, which
/// is pushed to the asset host first.
fn resolve_image(ctx: &Context, image: Option<&String>) -> Result<Option<String>> {
    let Some(image) = image else {
        return Ok(None);
    };
    if image.starts_with("http://") || image.starts_with("https://") {
        return Ok(Some(image.clone()));
    }

    let (Some(endpoint), Some(preset)) = (
        ctx.config.uploads.endpoint(),
        ctx.config.uploads.upload_preset.clone(),
    ) else {
        return Err(anyhow::anyhow!(
            "uploads are not configured; set uploads.cloud_name and uploads.upload_preset"
        ));
    };

    verbose(ctx, &format!("uploading {}", image));
    let url = upload::upload_image(&endpoint, &preset, std::path::Path::new(image))?;
    let _ = ctx.journal.borrow_mut().upload(&url);
    println!("Uploaded image: {}", url);
    Ok(Some(url))
}

fn show_posts(ctx: &Context, page: u64) {
    let mut posts = ctx.posts.borrow_mut();
    match posts.list(page, &CancelToken::new()) {
        Ok(()) => {
            if posts.posts().is_empty() {
                println!("No posts.");
            }
            for post in posts.posts() {
                println!(
                    "  {}  {:<30}  ${:<9.2}  [{}]",
                    post.id, post.title, post.price, post.category
                );
            }
            let pg = posts.pagination();
            println!("Page {}/{} ({} total)", pg.page, pg.pages, pg.total);
        }
        Err(e) => report_api_error(&e),
    }
}

fn show_post(ctx: &Context, id: &str) {
    let result = ctx.posts.borrow_mut().get(id, &CancelToken::new());
    match result {
        Ok(post) => {
            println!("{}  {}", post.id, post.title);
            println!("  price:    ${:.2}", post.price);
            println!("  category: {}", post.category);
            if !post.image.is_empty() {
                println!("  image:    {}", post.image);
            }
            println!("  {}", post.description);
        }
        Err(e) => report_api_error(&e),
    }
}

fn show_categories(ctx: &Context) {
    let mut categories = ctx.categories.borrow_mut();
    match categories.list(&CancelToken::new()) {
        Ok(()) => {
            if categories.categories().is_empty() {
                println!("No categories.");
            }
            for category in categories.categories() {
                println!(
                    "  {}  {:<24}  updated {}",
                    category.id,
                    category.name,
                    category.updated_at.format("%Y-%m-%d")
                );
            }
        }
        Err(e) => report_api_error(&e),
    }
}

fn show_category(ctx: &Context, id: &str) {
    let category = match ctx.categories.borrow_mut().get(id, &CancelToken::new()) {
        Ok(category) => category,
        Err(e) => {
            report_api_error(&e);
            return;
        }
    };
    println!("{}  {}", category.id, category.name);

    let mut posts = ctx.posts.borrow_mut();
    if let Err(e) = posts.list(1, &CancelToken::new()) {
        report_api_error(&e);
        return;
    }
    let matching: Vec<_> = posts
        .posts()
        .iter()
        .filter(|p| p.category == category.id)
        .collect();
    if matching.is_empty() {
        println!("  no posts on this page");
    }
    for post in matching {
        println!("  {}  {:<30}  ${:.2}", post.id, post.title, post.price);
    }
}

fn show_users(ctx: &Context, page: u64) {
    let mut admin = ctx.admin.borrow_mut();
    match admin.list(page, &CancelToken::new()) {
        Ok(()) => {
            for user in admin.users() {
                println!(
                    "  {}  {:<20}  {:<28}  {}",
                    user.id,
                    user.name,
                    user.email,
                    user.role.as_str()
                );
            }
            let pg = admin.pagination();
            println!("Page {}/{} ({} total)", pg.page, pg.pages, pg.total);
        }
        Err(e) => report_api_error(&e),
    }
}

fn show_dashboard(ctx: &Context) {
    if let Some(user) = ctx.auth.borrow().user() {
        println!("Dashboard - {} ({})", user.name, user.role.as_str());
    }
    show_users(ctx, 1);
}

fn show_settings(ctx: &Context) {
    let auth = ctx.auth.borrow();
    if let Some(user) = auth.user() {
        println!("Profile: {} <{}> role={}", user.name, user.email, user.role.as_str());
    }
    println!("  profile [--name N] [--email E]");
    println!("  password <current> <new> <confirm>");
}

/// Parse `--key value` pairs from pre-tokenized arguments.
fn parse_flags(args: &[String]) -> Result<HashMap<String, String>, String> {
    let mut flags = HashMap::new();
    let mut i = 0;
    while i < args.len() {
        let Some(key) = args[i].strip_prefix("--") else {
            return Err(format!("unexpected argument: {}", args[i]));
        };
        let Some(value) = args.get(i + 1) else {
            return Err(format!("missing value for --{}", key));
        };
        flags.insert(key.to_string(), value.clone());
        i += 2;
    }
    Ok(flags)
}

fn report_api_error(error: &ApiError) {
    println!("Error: {}", error);
    for field in error.fields() {
        println!("  - {}", field);
    }
}

fn report_error(error: &anyhow::Error) {
    match error.downcast_ref::<ApiError>() {
        Some(api_error) => report_api_error(api_error),
        None => println!("Error: {}", error),
    }
}

fn report_form_errors(errors: &[validate::FormError]) {
    println!("Invalid input:");
    for error in errors {
        println!("  - {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args: Vec<String> = ["--name", "Ana Maria", "--email", "ana@example.com"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let flags = parse_flags(&args).unwrap();
        assert_eq!(flags.get("name").map(String::as_str), Some("Ana Maria"));
        assert_eq!(
            flags.get("email").map(String::as_str),
            Some("ana@example.com")
        );
    }

    #[test]
    fn test_parse_flags_rejects_positionals() {
        let args = vec!["stray".to_string()];
        assert!(parse_flags(&args).is_err());
    }

    #[test]
    fn test_parse_flags_requires_value() {
        let args = vec!["--name".to_string()];
        let err = parse_flags(&args).unwrap_err();
        assert!(err.contains("--name"));
    }
}
