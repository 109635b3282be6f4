//! HTML rendering for every page.
//!
//! Pages are assembled with `format!` around a shared [`layout`]. All
//! user-supplied text goes through [`escape`].

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use polls_core::{
  account::User,
  choice::{Choice, QuestionResults},
  question::{Question, Window},
};

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#x27;"),
      c => out.push(c),
    }
  }
  out
}

fn layout(title: &str, user: Option<&User>, body: &str) -> String {
  let nav = match user {
    Some(u) => format!(
      r#"<span>Signed in as {}</span>
      <form method="post" action="/accounts/logout/" class="inline"><button type="submit">Log out</button></form>"#,
      escape(&u.username)
    ),
    None => r#"<a href="/accounts/login/">Log in</a> <a href="/signup/">Sign up</a>"#.to_owned(),
  };
  format!(
    r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
</head>
<body>
  <nav><a href="/">Polls</a> {nav}</nav>
  <main>
{body}
  </main>
</body>
</html>
"#,
    title = escape(title),
  )
}

fn date(dt: DateTime<Utc>) -> String { dt.format("%Y-%m-%d %H:%M UTC").to_string() }

// ─── Polls ───────────────────────────────────────────────────────────────────

/// Flash-style notices carried in the index URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
  Expired,
}

impl Notice {
  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "expired" => Some(Self::Expired),
      _ => None,
    }
  }

  fn message(self) -> &'static str {
    match self {
      Self::Expired => "Poll expired!, please choose another question",
    }
  }
}

pub fn index(
  questions: &[Question],
  now: DateTime<Utc>,
  notice: Option<Notice>,
  user: Option<&User>,
) -> String {
  let mut body = String::from("<h1>Polls</h1>\n");
  if let Some(n) = notice {
    let _ = writeln!(body, r#"<p class="warning">{}</p>"#, escape(n.message()));
  }

  if questions.is_empty() {
    body.push_str("<p>No polls are available.</p>\n");
  } else {
    body.push_str("<ul>\n");
    for q in questions {
      let status = match q.window(now) {
        Window::Open => "open",
        Window::Closed => "closed",
        Window::Upcoming => "upcoming",
      };
      let recent = if q.was_published_recently(now) { r#" <em class="new">new</em>"# } else { "" };
      let _ = writeln!(
        body,
        r#"<li><a href="/{id}/">{text}</a> <span class="status">{status}</span>{recent} <a href="/{id}/results/">results</a></li>"#,
        id = q.id,
        text = escape(&q.text),
      );
    }
    body.push_str("</ul>\n");
  }

  layout("Polls", user, &body)
}

/// The ballot page. `previous` is the signed-in user's current selection.
pub fn detail(
  question: &Question,
  choices: &[Choice],
  previous: Option<&Choice>,
  error: Option<&str>,
  user: Option<&User>,
  now: DateTime<Utc>,
) -> String {
  let mut body = format!("<h1>{}</h1>\n", escape(&question.text));
  let _ = writeln!(
    body,
    r#"<p class="window">Open {} to {}</p>"#,
    date(question.pub_date),
    date(question.end_date)
  );

  if let Some(msg) = error {
    let _ = writeln!(body, r#"<p class="error"><strong>{}</strong></p>"#, escape(msg));
  }

  if question.can_vote(now) {
    let _ = writeln!(body, r#"<form action="/{}/vote/" method="post">"#, question.id);
    body.push_str("<fieldset>\n");
    for (n, c) in choices.iter().enumerate() {
      let checked = if previous.map(|p| p.id) == Some(c.id) { " checked" } else { "" };
      let _ = writeln!(
        body,
        r#"<input type="radio" name="choice" id="choice{n}" value="{id}"{checked}><label for="choice{n}">{text}</label><br>"#,
        n = n + 1,
        id = c.id,
        text = escape(&c.text),
      );
    }
    body.push_str("</fieldset>\n<button type=\"submit\">Vote</button>\n</form>\n");
  } else {
    body.push_str("<p class=\"notice\">Voting on this poll has closed.</p>\n");
  }

  match user {
    Some(_) => {
      let selected = previous.map(|c| escape(&c.text)).unwrap_or_else(|| "None".to_owned());
      let _ = writeln!(body, r#"<p class="previous">Your vote: {selected}</p>"#);
    }
    None => {
      let _ = writeln!(
        body,
        r#"<p><a href="/accounts/login/?next=/{}/">Log in</a> to vote.</p>"#,
        question.id
      );
    }
  }

  let _ = writeln!(body, r#"<a href="/{}/results/">View results</a>"#, question.id);
  layout(&question.text, user, &body)
}

pub fn results(results: &QuestionResults, user: Option<&User>) -> String {
  let q = &results.question;
  let mut body = format!("<h1>{}</h1>\n<ul>\n", escape(&q.text));
  for t in &results.tallies {
    let plural = if t.votes == 1 { "" } else { "s" };
    let _ = writeln!(
      body,
      "<li>{} -- {} vote{plural}</li>",
      escape(&t.choice.text),
      t.votes
    );
  }
  let _ = writeln!(body, "</ul>\n<p>Total votes: {}</p>", results.total_votes());
  let _ = writeln!(body, r#"<a href="/{}/">Vote again?</a>"#, q.id);
  layout(&q.text, user, &body)
}

// ─── Accounts ────────────────────────────────────────────────────────────────

fn error_list(errors: &[String]) -> String {
  if errors.is_empty() {
    return String::new();
  }
  let mut out = String::from("<ul class=\"errorlist\">\n");
  for e in errors {
    let _ = writeln!(out, "<li>{}</li>", escape(e));
  }
  out.push_str("</ul>\n");
  out
}

pub fn signup(username: &str, errors: &[String]) -> String {
  let body = format!(
    r#"<h1>Sign up</h1>
{errors}<form method="post" action="/signup/">
<label for="id_username">Username</label> <input type="text" name="username" id="id_username" value="{username}" maxlength="150" required><br>
<label for="id_password1">Password</label> <input type="password" name="password1" id="id_password1" required><br>
<label for="id_password2">Password confirmation</label> <input type="password" name="password2" id="id_password2" required><br>
<button type="submit">Sign up</button>
</form>
"#,
    errors = error_list(errors),
    username = escape(username),
  );
  layout("Sign up", None, &body)
}

pub fn login(username: &str, next: &str, errors: &[String]) -> String {
  let body = format!(
    r#"<h1>Log in</h1>
{errors}<form method="post" action="/accounts/login/">
<input type="hidden" name="next" value="{next}">
<label for="id_username">Username</label> <input type="text" name="username" id="id_username" value="{username}" required><br>
<label for="id_password">Password</label> <input type="password" name="password" id="id_password" required><br>
<button type="submit">Log in</button>
</form>
<p>No account? <a href="/signup/">Sign up</a>.</p>
"#,
    errors = error_list(errors),
    next = escape(next),
    username = escape(username),
  );
  layout("Log in", None, &body)
}

// ─── Errors ──────────────────────────────────────────────────────────────────

pub fn not_found() -> String {
  layout("Not found", None, "<h1>Not found</h1>\n<p>The requested page does not exist.</p>\n")
}

pub fn server_error() -> String {
  layout("Server error", None, "<h1>Server error</h1>\n<p>Something went wrong. Please try again.</p>\n")
}

#[cfg(test)]
mod tests {
  use chrono::TimeDelta;
  use polls_core::{
    choice::{ChoiceId, ChoiceTally},
    question::QuestionId,
  };

  use super::*;

  fn question(pub_days: i64, end_days: i64, now: DateTime<Utc>) -> Question {
    Question {
      id:       QuestionId(4),
      text:     "<b>Tea</b> or coffee?".into(),
      pub_date: now + TimeDelta::days(pub_days),
      end_date: now + TimeDelta::days(end_days),
    }
  }

  fn choice(id: i64, text: &str) -> Choice {
    Choice { id: ChoiceId(id), question_id: QuestionId(4), text: text.into() }
  }

  #[test]
  fn escapes_markup() {
    assert_eq!(escape(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;");
  }

  #[test]
  fn index_escapes_question_text() {
    let now = Utc::now();
    let html = index(&[question(-1, 1, now)], now, None, None);
    assert!(html.contains("&lt;b&gt;Tea&lt;/b&gt;"));
    assert!(!html.contains("<b>Tea</b>"));
    assert!(html.contains(r#"href="/4/""#));
  }

  #[test]
  fn closed_question_has_no_ballot() {
    let now = Utc::now();
    let html = detail(&question(-30, -15, now), &[choice(1, "Tea")], None, None, None, now);
    assert!(html.contains("Voting on this poll has closed."));
    assert!(!html.contains("<form action=\"/4/vote/\""));
  }

  #[test]
  fn previous_choice_is_checked() {
    let now = Utc::now();
    let user = User { id: Default::default(), username: "ann".into(), created_at: now };
    let choices = [choice(1, "Tea"), choice(2, "Coffee")];
    let html = detail(&question(-1, 1, now), &choices, Some(&choices[1]), None, Some(&user), now);
    assert!(html.contains(r#"value="2" checked"#));
    assert!(html.contains("Your vote: Coffee"));
  }

  #[test]
  fn results_pluralise() {
    let now = Utc::now();
    let r = QuestionResults {
      question: question(-1, 1, now),
      tallies:  vec![
        ChoiceTally { choice: choice(1, "Tea"), votes: 1 },
        ChoiceTally { choice: choice(2, "Coffee"), votes: 2 },
      ],
    };
    let html = results(&r, None);
    assert!(html.contains("Tea -- 1 vote</li>"));
    assert!(html.contains("Coffee -- 2 votes</li>"));
    assert!(html.contains("Total votes: 3"));
  }
}
