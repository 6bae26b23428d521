//! Sample content for a fresh install.

use std::sync::Arc;

use serde_json::json;

use crate::db::models::{Category, Project, ResumeItem, Service, Testimonial, User};
use crate::db::{Repository, Resource, Store};
use crate::error::Result;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "password123";

/// How many documents [`import`] wrote per collection.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub services: usize,
    pub resume: usize,
    pub categories: usize,
    pub projects: usize,
    pub testimonials: usize,
    pub users: usize,
}

async fn create_all<R: Resource>(
    store: &Arc<dyn Store>,
    cost: u32,
    items: Vec<serde_json::Value>,
) -> Result<Vec<crate::db::Document<R>>> {
    let repo = Repository::<R>::new(store.clone(), cost);
    let mut created = Vec::with_capacity(items.len());
    for item in items {
        created.push(repo.create(item).await?);
    }
    Ok(created)
}

/// Delete every seeded collection.
pub async fn destroy(store: &Arc<dyn Store>) -> Result<()> {
    for collection in [
        User::COLLECTION,
        ResumeItem::COLLECTION,
        Service::COLLECTION,
        Project::COLLECTION,
        Category::COLLECTION,
        Testimonial::COLLECTION,
    ] {
        let removed = store.delete_all(collection).await?;
        tracing::info!(collection, removed, "collection cleared");
    }
    Ok(())
}

/// Replace the seeded collections with the sample data and an admin user.
pub async fn import(store: &Arc<dyn Store>, cost: u32) -> Result<SeedSummary> {
    destroy(store).await?;

    let services = create_all::<Service>(store, cost, vec![
        json!({
            "title": "Graphic Design",
            "description": "Creative designs for Social Media, Posters, and wide-ranging Marketing Creatives that capture attention.",
            "icon": "ux",
            "price": 100
        }),
        json!({
            "title": "Branding & Identity",
            "description": "Complete Brand Systems, Logos, and Guidelines to establish a strong and memorable market presence.",
            "icon": "system",
            "price": 150
        }),
        json!({
            "title": "Motion Graphics & Video",
            "description": "High-quality video production and motion graphics that bring your stories to life.",
            "icon": "web",
            "price": 120
        }),
        json!({
            "title": "Content & Voice Over",
            "description": "Professional Content Writing and Voice Over Production to convey your message clearly.",
            "icon": "wireframe",
            "price": 50
        }),
    ])
    .await?;

    let resume = create_all::<ResumeItem>(store, cost, vec![
        json!({
            "title": "Senior Creative Visual Producer",
            "organization": "Deero Advert",
            "duration": "2021 - Present",
            "description": "Leading creative visual production and managing branding & video projects. Overseeing a team of designers and editors to deliver high-quality content.",
            "type": "experience",
            "order": 1
        }),
        json!({
            "title": "CEO & Founder",
            "organization": "Guhaad Creatives & Advertisement Agency",
            "duration": "2019 - Present",
            "description": "Founded and currently managing a creative agency focused on digital marketing, branding, and multimedia production.",
            "type": "experience",
            "order": 2
        }),
        json!({
            "title": "Multimedia Specialist",
            "organization": "Freelance",
            "duration": "2018 - 2020",
            "description": "Worked with multiple clients to produce engaging video content, motion graphics, and comprehensive brand identity packages.",
            "type": "experience",
            "order": 3
        }),
        json!({
            "title": "Bachelor of Multimedia Arts",
            "organization": "University of Creative Arts",
            "duration": "2015 - 2019",
            "description": "Specialized in visual communication, digital media, and interactive design.",
            "type": "education",
            "order": 1
        }),
        json!({
            "title": "Certified Digital Marketer",
            "organization": "Google Digital Garage",
            "duration": "2020",
            "description": "Comprehensive certification in online marketing strategies, SEO, and analytics.",
            "type": "education",
            "order": 2
        }),
    ])
    .await?;

    let categories = create_all::<Category>(store, cost, vec![
        json!({"name": "Web Design", "color": "#ff014f"}),
        json!({"name": "Graphic Design", "color": "#3b82f6"}),
    ])
    .await?;

    let projects = create_all::<Project>(store, cost, vec![
        json!({
            "title": "Inbio Portfolio Design",
            "description": "A premium portfolio design with neumorphic style.",
            "image": "https://images.unsplash.com/photo-1460925895917-afdab827c52f?w=800&auto=format&fit=crop&q=60",
            "category": categories[0].id,
            "likes": 120
        }),
        json!({
            "title": "Brand Motion Graphics",
            "description": "Dynamic motion graphics for a tech startup branding.",
            "image": "https://images.unsplash.com/photo-1551434678-e076c223a692?w=800&auto=format&fit=crop&q=60",
            "category": categories[1].id,
            "likes": 85
        }),
    ])
    .await?;

    let testimonials = create_all::<Testimonial>(store, cost, vec![json!({
        "name": "John Doe",
        "position": "Marketing Manager",
        "message": "Working with Guhaad was a game changer for our brand. The visual identity they created is stunning.",
        "rating": 5,
        "image": "https://images.unsplash.com/photo-1599566150163-29194dcaad36?w=100&auto=format&fit=crop&q=60"
    })])
    .await?;

    let users = create_all::<User>(store, cost, vec![json!({
        "name": "Admin User",
        "email": ADMIN_EMAIL,
        "role": "admin",
        "password": ADMIN_PASSWORD
    })])
    .await?;

    tracing::info!(email = ADMIN_EMAIL, "sample data imported, admin user created");

    Ok(SeedSummary {
        services: services.len(),
        resume: resume.len(),
        categories: categories.len(),
        projects: projects.len(),
        testimonials: testimonials.len(),
        users: users.len(),
    })
}
