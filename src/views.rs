// Browser pages - server-rendered HTML for sign-in, locations and reviews

use std::fmt::Write;

use crate::dashboard::{format_date, LocationCard, LocationsView, ReviewsPanel, ReviewsView};
use crate::models::{Insights, Review};
use crate::session::UserProfile;

const LAYOUT: &str = include_str!("../web/layout.html");

const CREATE_PROFILE_URL: &str = "https://business.google.com/";

/// Escape text for HTML element content and quoted attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    LAYOUT
        .replace("{{title}}", &escape(title))
        .replace("{{body}}", body)
}

fn nav(user: &UserProfile) -> String {
    format!(
        r#"<nav><div class="inner">
    <a class="brand" href="/">MyGoProfile</a>
    <div class="user"><span>Welcome, {}</span><a href="/auth/signout">Sign out</a></div>
</div></nav>"#,
        escape(&user.name)
    )
}

// ============================================================================
// PAGES
// ============================================================================

pub fn sign_in_page() -> String {
    page(
        "Sign in",
        r#"<div class="centered"><div>
    <h2>MyGoProfile</h2>
    <p>Manage your Google Business Profile reviews and insights</p>
    <a class="button" href="/auth/signin">Sign in with Google</a>
</div></div>"#,
    )
}

/// Shown on pages that need a session when there is none
pub fn sign_in_required_page(message: &str) -> String {
    page(
        "Sign in required",
        &format!(
            r#"<div class="centered"><div>
    <p>{}</p>
    <a href="/auth/signin">Sign in</a> or <a href="/">Go to Home</a>
</div></div>"#,
            escape(message)
        ),
    )
}

/// Sign-in round trip failed
pub fn auth_error_page(message: &str) -> String {
    page(
        "Sign-in failed",
        &format!(
            r#"<div class="centered"><div>
    <p class="error">{}</p>
    <a class="button" href="/auth/signin">Try Again</a>
</div></div>"#,
            escape(message)
        ),
    )
}

pub fn dashboard_page(user: &UserProfile, view: &LocationsView) -> String {
    let content = match view {
        LocationsView::Loaded(cards) => {
            let mut grid = String::from(r#"<div class="grid">"#);
            for card in cards {
                grid.push_str(&location_card(card));
            }
            grid.push_str("</div>");
            grid
        }
        LocationsView::Empty => empty_locations(),
        LocationsView::Failed(err) => failure(err.message(), "/", err.needs_sign_in()),
    };

    let body = format!(
        r#"{}
<main><div class="panel">
    <h2>Select Your Business</h2>
    <p class="muted">Choose which Google Business Profile you'd like to manage</p>
    {}
</div></main>"#,
        nav(user),
        content
    );
    page("Dashboard", &body)
}

pub fn reviews_page(user: &UserProfile, panel: &ReviewsPanel) -> String {
    let content = match &panel.reviews {
        ReviewsView::NoLocation => {
            r#"<p class="muted">No location specified</p><a href="/">Go to Home</a>"#.to_string()
        }
        ReviewsView::Empty => {
            r#"<p class="muted">No reviews found for this location</p>"#.to_string()
        }
        ReviewsView::Failed(err) => failure(err.message(), &panel.retry_href(), err.needs_sign_in()),
        ReviewsView::Loaded(reviews) => reviews.iter().map(review_item).collect(),
    };

    let insights = panel.insights.as_ref().map(insights_bar).unwrap_or_default();

    let body = format!(
        r#"{}
<main>
    <p><a href="/">&larr; Back to Dashboard</a></p>
    <section class="reviews">
        <header>
            <h1>Reviews for {}</h1>
            <p class="muted">Manage your Google Business Profile reviews</p>
        </header>
        <div class="body">{}{}</div>
    </section>
</main>"#,
        nav(user),
        escape(&panel.title),
        insights,
        content
    );
    page(&format!("Reviews for {}", panel.title), &body)
}

// ============================================================================
// FRAGMENTS
// ============================================================================

fn location_card(card: &LocationCard) -> String {
    let mut details = String::new();
    if !card.street.is_empty() {
        let _ = write!(details, "<p>{}</p>", escape(&card.street));
    }
    if !card.city_line.is_empty() {
        let _ = write!(details, r#"<p class="muted">{}</p>"#, escape(&card.city_line));
    }
    if let Some(phone) = &card.phone {
        let _ = write!(details, "<p>{}</p>", escape(phone));
    }
    if let Some(website) = &card.website {
        let _ = write!(
            details,
            r#"<p><a href="{}" target="_blank" rel="noopener noreferrer">Visit Website</a></p>"#,
            escape(website)
        );
    }

    format!(
        r#"<div class="card">
    <header><h3>{}</h3><span class="badge">Active</span></header>
    <div class="details">{}</div>
    <div class="actions"><a class="button" href="{}">Manage Reviews</a></div>
</div>"#,
        escape(&card.title),
        details,
        escape(&card.reviews_href())
    )
}

fn empty_locations() -> String {
    format!(
        r#"<div class="empty">
    <h3>No businesses found</h3>
    <p class="muted">You don't have any Google Business Profiles associated with this account.</p>
    <a class="button" href="{}" target="_blank" rel="noopener noreferrer">Create a Business Profile</a>
</div>"#,
        CREATE_PROFILE_URL
    )
}

/// Soft failure: the message plus a way forward
fn failure(message: &str, retry_href: &str, needs_sign_in: bool) -> String {
    let action = if needs_sign_in {
        r#"<a class="button" href="/auth/signin">Sign in again</a>"#.to_string()
    } else {
        format!(
            r#"<a class="button secondary" href="{}">Try Again</a>"#,
            escape(retry_href)
        )
    };
    format!(
        r#"<div class="empty"><p class="error">{}</p>{}</div>"#,
        escape(message),
        action
    )
}

fn insights_bar(insights: &Insights) -> String {
    format!(
        r#"<div class="insights">
    <div><strong>{}</strong>Views</div>
    <div><strong>{}</strong>Clicks</div>
    <div><strong>{}</strong>Calls</div>
    <div><strong>{}</strong>Directions</div>
</div>"#,
        insights.total_views,
        insights.total_clicks,
        insights.total_calls,
        insights.total_direction_requests
    )
}

fn review_item(review: &Review) -> String {
    let reviewer = &review.reviewer;
    let avatar = match &reviewer.profile_photo_url {
        Some(url) => format!(
            r#"<img class="avatar" src="{}" alt="{}">"#,
            escape(url),
            escape(&reviewer.display_name)
        ),
        None => format!(r#"<div class="avatar">{}</div>"#, escape(&reviewer.initial())),
    };

    let comment = if review.comment.is_empty() {
        String::new()
    } else {
        format!(r#"<p class="comment">{}</p>"#, escape(&review.comment))
    };

    let reply = review
        .review_reply
        .as_ref()
        .map(|reply| {
            format!(
                r#"<div class="reply"><span class="label">Business Response</span><span class="muted">{}</span><p>{}</p></div>"#,
                format_date(&reply.update_time),
                escape(&reply.comment)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<article class="review">{}<div>
    <div class="meta"><strong>{}</strong><span class="stars">{}</span><span class="muted">{}</span></div>
    {}{}
</div></article>"#,
        avatar,
        escape(&reviewer.display_name),
        review.star_rating.glyphs(),
        format_date(&review.create_time),
        comment,
        reply
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReviewReply, Reviewer, StarRating};
    use crate::proxy::ProxyError;

    fn user() -> UserProfile {
        UserProfile {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    fn card(title: &str) -> LocationCard {
        LocationCard {
            name: "accounts/1/locations/2".to_string(),
            title: title.to_string(),
            street: "123 Main St".to_string(),
            city_line: "City, State 12345".to_string(),
            phone: Some("+1-555-123-4567".to_string()),
            website: None,
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_sign_in_page_links_to_oauth() {
        let html = sign_in_page();
        assert!(html.contains(r#"href="/auth/signin""#));
        assert!(html.contains("Sign in with Google"));
        assert!(html.contains("<title>Sign in - MyGoProfile</title>"));
    }

    #[test]
    fn test_dashboard_renders_one_card_per_location() {
        let view = LocationsView::Loaded(vec![card("My Business Location")]);
        let html = dashboard_page(&user(), &view);

        assert_eq!(html.matches(r#"<div class="card">"#).count(), 1);
        assert!(html.contains("<h3>My Business Location</h3>"));
        assert!(html.contains("Manage Reviews"));
        assert!(html.contains("/reviews?location=accounts%2F1%2Flocations%2F2"));
        assert!(html.contains("Welcome, Ada"));
    }

    #[test]
    fn test_dashboard_escapes_titles() {
        let view = LocationsView::Loaded(vec![card("<script>alert(1)</script>")]);
        let html = dashboard_page(&user(), &view);

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_dashboard_empty_state() {
        let html = dashboard_page(&user(), &LocationsView::Empty);

        assert!(html.contains("No businesses found"));
        assert!(html.contains(CREATE_PROFILE_URL));
        assert!(!html.contains(r#"class="card""#));
    }

    #[test]
    fn test_dashboard_failure_offers_retry() {
        let err = ProxyError::Internal {
            message: "Failed to fetch business accounts".to_string(),
            details: "timeout".to_string(),
        };
        let html = dashboard_page(&user(), &LocationsView::Failed(err));

        assert!(html.contains("Failed to fetch business accounts"));
        assert!(html.contains("Try Again"));
        assert!(!html.contains("timeout"));
    }

    #[test]
    fn test_reviews_page_renders_reply_and_stars() {
        let review = Review {
            name: None,
            review_id: "r1".to_string(),
            reviewer: Reviewer {
                display_name: "John Doe".to_string(),
                profile_photo_url: None,
                is_anonymous: false,
            },
            star_rating: StarRating::Five,
            comment: "Great service!".to_string(),
            create_time: "2024-01-15T10:30:00Z".parse().unwrap(),
            update_time: "2024-01-15T10:30:00Z".parse().unwrap(),
            review_reply: Some(ReviewReply {
                comment: "Thank you!".to_string(),
                update_time: "2024-01-16T09:00:00Z".parse().unwrap(),
            }),
        };
        let panel = ReviewsPanel {
            location_name: Some("accounts/1/locations/2".to_string()),
            title: "My Business Location".to_string(),
            reviews: ReviewsView::Loaded(vec![review]),
            insights: Some(Insights {
                total_views: 1250,
                total_clicks: 89,
                total_calls: 23,
                total_direction_requests: 45,
            }),
        };

        let html = reviews_page(&user(), &panel);
        assert!(html.contains("Reviews for My Business Location"));
        assert!(html.contains("★★★★★"));
        assert!(html.contains("January 15, 2024"));
        assert!(html.contains("Business Response"));
        assert!(html.contains(r#"<div class="avatar">J</div>"#));
        assert!(html.contains("<strong>1250</strong>Views"));
    }

    #[test]
    fn test_reviews_page_auth_failure_prompts_sign_in() {
        let panel = ReviewsPanel {
            location_name: Some("accounts/1/locations/2".to_string()),
            title: "Shop".to_string(),
            reviews: ReviewsView::Failed(ProxyError::Unauthorized(
                crate::proxy::AUTH_EXPIRED.to_string(),
            )),
            insights: None,
        };

        let html = reviews_page(&user(), &panel);
        assert!(html.contains("Authentication expired"));
        assert!(html.contains("Sign in again"));
        assert!(!html.contains(r#"class="insights""#));
    }

    #[test]
    fn test_reviews_page_without_location() {
        let panel = ReviewsPanel {
            location_name: None,
            title: "Business".to_string(),
            reviews: ReviewsView::NoLocation,
            insights: None,
        };

        assert!(reviews_page(&user(), &panel).contains("No location specified"));
    }
}
