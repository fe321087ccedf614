pub mod auth;
pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::login)
            .service(auth::logout)
            .service(auth::refresh)
            .service(auth::me)
            .service(auth::change_password),
    )
    .service(
        web::scope("/users")
            .service(users::create_user)
            .service(users::list_users)
            .service(users::get_user)
            .service(users::update_user)
            .service(users::delete_user)
            .service(users::get_user_tasks)
            .service(users::assign_task_to_user)
            .service(users::remove_task_from_user),
    )
    .service(
        web::scope("/tasks")
            .service(tasks::create_task)
            .service(tasks::list_tasks)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::update_task_status)
            .service(tasks::delete_task)
            .service(tasks::get_task_users)
            .service(tasks::assign_user_to_task)
            .service(tasks::remove_user_from_task),
    );
}
