use std::net::TcpListener;

use actix_web::{
    dev::Server,
    middleware::Logger,
    web::{self, Data},
    App, HttpServer,
};

use crate::{
    routes::{classify_route, default_route, directory_route, job_route, search_route},
    session::Session,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(default_route::health)
        .service(
            web::scope("/search")
                .service(search_route::run_search)
                .service(search_route::harvest)
                .service(search_route::cancel)
                .service(search_route::state)
                .service(search_route::expand),
        )
        .service(
            web::scope("/classify")
                .service(classify_route::classify_one)
                .service(classify_route::classify_batch),
        )
        .service(
            web::scope("/jobs")
                .service(job_route::notifications)
                .service(job_route::job),
        )
        .service(web::scope("/directory").service(directory_route::save));
}

pub fn run(listener: TcpListener, session: Data<Session>) -> Result<Server, std::io::Error> {
    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(configure)
            .app_data(session.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
